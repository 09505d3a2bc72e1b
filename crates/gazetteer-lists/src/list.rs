//! Dictionary list files: one entry per line, with optional inline features.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;

use crate::{ListsError, resource};

/// Features attached to a single list entry, ordered by key.
pub type FeatureMap = BTreeMap<String, String>;

/// One line of a list file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    text: String,
    features: Option<FeatureMap>,
}

impl ListEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            features: None,
        }
    }

    pub fn with_features(text: impl Into<String>, features: FeatureMap) -> Self {
        Self {
            text: text.into(),
            features: Some(features),
        }
    }

    /// The literal entry text, as written in the list file.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn features(&self) -> Option<&FeatureMap> {
        self.features.as_ref()
    }
}

/// The entries read from one list file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DictionaryList {
    location: Option<PathBuf>,
    entries: Vec<ListEntry>,
}

impl DictionaryList {
    /// Read and parse the list at `path`.
    ///
    /// With a `separator`, everything after its first occurrence on a line is
    /// decoded as `key=value` features; without one, whole lines are entries.
    pub fn load(
        path: &Path,
        encoding: &'static Encoding,
        separator: Option<&str>,
    ) -> Result<Self, ListsError> {
        let content = resource::read_text(path, encoding)?;
        let mut list = Self::parse(&content, separator);
        list.location = Some(path.to_path_buf());
        tracing::debug!(
            path = %path.display(),
            entries = list.len(),
            "loaded dictionary list"
        );
        Ok(list)
    }

    /// Parse list content that is already in memory.
    pub fn parse(content: &str, separator: Option<&str>) -> Self {
        let separator = separator.filter(|s| !s.is_empty());
        let entries = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(idx, line)| parse_line(line, separator, idx + 1))
            .collect();
        Self {
            location: None,
            entries,
        }
    }

    pub fn from_entries(entries: impl IntoIterator<Item = ListEntry>) -> Self {
        Self {
            location: None,
            entries: entries.into_iter().collect(),
        }
    }

    /// Where this list was read from, if it came from a file.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn entries(&self) -> &[ListEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ListEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a DictionaryList {
    type Item = &'a ListEntry;
    type IntoIter = std::slice::Iter<'a, ListEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn parse_line(line: &str, separator: Option<&str>, line_no: usize) -> Option<ListEntry> {
    let Some((separator, text, rest)) =
        separator.and_then(|sep| line.split_once(sep).map(|(text, rest)| (sep, text, rest)))
    else {
        return Some(ListEntry::new(line));
    };
    if text.is_empty() {
        tracing::warn!(line = line_no, "list line has features but no entry, skipped");
        return None;
    }

    let mut features = FeatureMap::new();
    for field in rest.split(separator) {
        if field.is_empty() {
            tracing::warn!(line = line_no, entry = text, "empty feature field ignored");
            continue;
        }
        match field.split_once('=') {
            Some((key, value)) => features.insert(key.to_string(), value.to_string()),
            None => features.insert(field.to_string(), String::new()),
        };
    }
    Some(ListEntry::with_features(text, features))
}

/// Expand the escapes accepted in a configured feature separator.
///
/// Supports `\t`, `\n`, `\r`, `\\` and `\uXXXX`. Unknown escapes are kept
/// as written.
pub fn unescape_separator(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('t') => {
                chars.next();
                out.push('\t');
            }
            Some('n') => {
                chars.next();
                out.push('\n');
            }
            Some('r') => {
                chars.next();
                out.push('\r');
            }
            Some('\\') => {
                chars.next();
                out.push('\\');
            }
            Some('u') => {
                let hex: String = chars.clone().skip(1).take(4).collect();
                let decoded = (hex.len() == 4)
                    .then(|| u32::from_str_radix(&hex, 16).ok())
                    .flatten()
                    .and_then(char::from_u32);
                match decoded {
                    Some(ch) => {
                        // 'u' plus four hex digits
                        for _ in 0..5 {
                            chars.next();
                        }
                        out.push(ch);
                    }
                    None => out.push('\\'),
                }
            }
            _ => out.push('\\'),
        }
    }
    out
}
