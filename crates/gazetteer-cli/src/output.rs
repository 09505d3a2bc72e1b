use std::io::{self, Write};
use std::path::Path;

use clap::ValueEnum;
use gazetteer_core::{Annotation, AnnotationSet};
use owo_colors::OwoColorize;
use serde::Serialize;

#[derive(Clone, Copy, Debug)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(self) -> bool {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per file
    Json,
    /// One tab-separated line per annotation
    Tsv,
}

#[derive(Serialize)]
struct FileReport<'a> {
    file: String,
    annotations: Vec<AnnotationRecord<'a>>,
}

#[derive(Serialize)]
struct AnnotationRecord<'a> {
    #[serde(flatten)]
    annotation: &'a Annotation,
    text: &'a str,
}

pub fn print_document(
    w: &mut impl Write,
    path: &Path,
    text: &str,
    annotations: &AnnotationSet,
    format: OutputFormat,
) -> io::Result<()> {
    let sorted = annotations.sorted();
    match format {
        OutputFormat::Json => {
            let report = FileReport {
                file: path.display().to_string(),
                annotations: sorted
                    .into_iter()
                    .map(|annotation| AnnotationRecord {
                        annotation,
                        text: &text[annotation.start..annotation.end],
                    })
                    .collect(),
            };
            serde_json::to_writer(&mut *w, &report)?;
            writeln!(w)
        }
        OutputFormat::Tsv => {
            for a in sorted {
                let features: Vec<String> = a
                    .features
                    .iter()
                    .map(|(k, v)| format!("{k}={}", tsv_field(v)))
                    .collect();
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    path.display(),
                    a.start,
                    a.end,
                    a.annotation_type,
                    tsv_field(&text[a.start..a.end]),
                    features.join(";")
                )?;
            }
            Ok(())
        }
    }
}

fn tsv_field(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\t', "\\t")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

pub fn print_build_summary(
    w: &mut impl Write,
    lists: usize,
    entries: usize,
    states: usize,
    color: ColorMode,
) -> io::Result<()> {
    let msg = format!("Loaded {lists} lists, {entries} entries ({states} automaton states)");
    if color.enabled() {
        writeln!(w, "{}", msg.dimmed())
    } else {
        writeln!(w, "{msg}")
    }
}

pub fn print_failure(
    w: &mut impl Write,
    path: &Path,
    err: &anyhow::Error,
    color: ColorMode,
) -> io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}: {err:#}", "error:".red().bold(), path.display())
    } else {
        writeln!(w, "error: {}: {err:#}", path.display())
    }
}

pub fn print_summary(
    w: &mut impl Write,
    files: usize,
    annotations: usize,
    failures: usize,
    color: ColorMode,
) -> io::Result<()> {
    if color.enabled() {
        write!(
            w,
            "{} {} annotations in {} files",
            "Done:".bold(),
            annotations.green(),
            files
        )?;
        if failures > 0 {
            write!(w, ", {} failed", failures.red())?;
        }
    } else {
        write!(w, "Done: {annotations} annotations in {files} files")?;
        if failures > 0 {
            write!(w, ", {failures} failed")?;
        }
    }
    writeln!(w)
}
