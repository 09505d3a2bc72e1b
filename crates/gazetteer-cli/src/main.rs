use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use gazetteer_core::{
    BuildProgress, Document, EntrySyntax, Gazetteer, GazetteerConfig, MatchStrategy,
};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod output;

use output::{ColorMode, OutputFormat};

/// Gazetteer - Annotate text files with matches from dictionary lists
#[derive(Parser, Debug)]
#[command(name = "gazetteer", version, about, long_about = None)]
struct Args {
    /// Text files to annotate
    files: Vec<PathBuf>,

    /// Path or file:// URL of the lists definition file (lists.def)
    #[arg(long)]
    lists: Option<String>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep every match instead of only the longest one per type
    #[arg(long)]
    all_matches: bool,

    /// Do not add the matched text as a feature
    #[arg(long)]
    no_string_feature: bool,

    /// Do not add the dictionary entry as a feature
    #[arg(long)]
    no_entry_feature: bool,

    /// Annotation set to write into (default set if omitted)
    #[arg(long)]
    annotation_set: Option<String>,

    /// Separator between list entries and their features (accepts \t)
    #[arg(long)]
    separator: Option<String>,

    /// Character encoding of the list files
    #[arg(long)]
    encoding: Option<String>,

    /// Treat list entries as regular expressions
    #[arg(long)]
    pattern_entries: bool,

    /// Match by walking the automaton instead of one pattern per entry
    #[arg(long)]
    automaton: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Write the automaton as GML to this path
    #[arg(long)]
    dump_gml: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Number of files annotated at once
    #[arg(long, default_value_t = 4)]
    jobs: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let color = ColorMode(!args.no_color);

    // Resolve configuration: CLI flags > env vars > config file > defaults
    let config_path = config_file_path(args.config.as_deref(), env_var);
    let mut config = match &config_path {
        Some(path) => GazetteerConfig::from_file(path)?,
        None => GazetteerConfig::default(),
    };
    apply_env(&mut config, env_var)?;
    apply_args(&mut config, &args);
    if config.lists_location.is_none() {
        anyhow::bail!("No lists definition given. Use --lists or set GAZETTEER_LISTS.");
    }
    if args.files.is_empty() && args.dump_gml.is_none() {
        anyhow::bail!("No input files given.");
    }

    let gazetteer = tokio::task::spawn_blocking(move || build_gazetteer(config, color))
        .await
        .context("build task failed")??;
    let dictionary = gazetteer.dictionary()?;
    output::print_build_summary(
        &mut std::io::stderr(),
        dictionary.num_lists(),
        dictionary.num_entries(),
        dictionary.automaton().num_states(),
        color,
    )?;

    if let Some(ref gml_path) = args.dump_gml {
        std::fs::write(gml_path, dictionary.automaton().to_gml())
            .with_context(|| format!("cannot write {}", gml_path.display()))?;
        tracing::info!(path = %gml_path.display(), "automaton written");
    }

    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let mut tasks = Vec::with_capacity(args.files.len());
    for path in args.files {
        let worker = gazetteer.duplicate()?;
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        tasks.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let result = annotate_file(&worker, &path);
            (path, result)
        }));
    }

    let set_name = gazetteer.config().target_set().map(str::to_string);
    let mut stdout = std::io::stdout().lock();
    let mut stderr = std::io::stderr();
    let (mut files, mut annotations, mut failures) = (0usize, 0usize, 0usize);
    for task in tasks {
        let (path, result) = task.await.context("annotation task failed")?;
        match result {
            Ok(doc) => {
                let set = match set_name.as_deref() {
                    Some(name) => doc.named(name).cloned().unwrap_or_default(),
                    None => doc.annotations().clone(),
                };
                output::print_document(&mut stdout, &path, doc.text(), &set, args.format)?;
                files += 1;
                annotations += set.len();
            }
            Err(e) => {
                output::print_failure(&mut stderr, &path, &e, color)?;
                failures += 1;
            }
        }
    }
    stdout.flush()?;
    output::print_summary(&mut stderr, files, annotations, failures, color)?;

    if failures > 0 {
        anyhow::bail!("{failures} file(s) could not be annotated");
    }
    Ok(())
}

fn build_gazetteer(config: GazetteerConfig, color: ColorMode) -> anyhow::Result<Gazetteer> {
    let bar = if color.enabled() {
        ProgressBar::new(0)
    } else {
        ProgressBar::hidden()
    };
    bar.set_style(ProgressStyle::with_template(
        "{spinner} [{bar:30}] {pos}/{len} {msg}",
    )?);

    let mut gazetteer = Gazetteer::new(config);
    gazetteer.init_with_progress(|event| match event {
        BuildProgress::LoadingDefinition { location } => {
            bar.set_message(format!("reading {}", location.display()));
        }
        BuildProgress::ReadingList { list, index, total } => {
            bar.set_length(total as u64);
            bar.set_position(index as u64);
            bar.set_message(list);
        }
        BuildProgress::Complete { .. } => bar.finish_and_clear(),
    })?;
    Ok(gazetteer)
}

fn annotate_file(worker: &Gazetteer, path: &Path) -> anyhow::Result<Document> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let mut doc = Document::new(text);
    worker.execute(&mut doc)?;
    Ok(doc)
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// The config file to read: explicit path, then `GAZETTEER_CONFIG`, then
/// `<config dir>/gazetteer/config.toml` when it exists.
fn config_file_path(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| env("GAZETTEER_CONFIG").map(PathBuf::from))
        .or_else(|| {
            dirs::config_dir()
                .map(|dir| dir.join("gazetteer").join("config.toml"))
                .filter(|path| path.exists())
        })
}

fn apply_env(
    config: &mut GazetteerConfig,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(lists) = env("GAZETTEER_LISTS") {
        config.lists_location = Some(lists);
    }
    if let Some(encoding) = env("GAZETTEER_ENCODING") {
        config.encoding = encoding;
    }
    if let Some(separator) = env("GAZETTEER_SEPARATOR") {
        config.feature_separator = separator;
    }
    if let Some(set) = env("GAZETTEER_ANNOTATION_SET") {
        config.annotation_set_name = Some(set);
    }
    let flags: [(&str, &mut bool); 3] = [
        ("GAZETTEER_LONGEST_MATCH_ONLY", &mut config.longest_match_only),
        ("GAZETTEER_ADD_STRING_FEATURE", &mut config.add_string_feature),
        ("GAZETTEER_ADD_ENTRY_FEATURE", &mut config.add_entry_feature),
    ];
    for (name, slot) in flags {
        if let Some(value) = env(name) {
            *slot = parse_flag(&value).with_context(|| format!("invalid value for {name}"))?;
        }
    }
    Ok(())
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got {other:?}"),
    }
}

fn apply_args(config: &mut GazetteerConfig, args: &Args) {
    if let Some(ref lists) = args.lists {
        config.lists_location = Some(lists.clone());
    }
    if let Some(ref encoding) = args.encoding {
        config.encoding = encoding.clone();
    }
    if let Some(ref separator) = args.separator {
        config.feature_separator = separator.clone();
    }
    if let Some(ref set) = args.annotation_set {
        config.annotation_set_name = Some(set.clone());
    }
    if args.all_matches {
        config.longest_match_only = false;
    }
    if args.no_string_feature {
        config.add_string_feature = false;
    }
    if args.no_entry_feature {
        config.add_entry_feature = false;
    }
    if args.pattern_entries {
        config.entry_syntax = EntrySyntax::Pattern;
    }
    if args.automaton {
        config.match_strategy = MatchStrategy::Automaton;
    }
}
