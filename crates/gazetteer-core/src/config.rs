//! Engine configuration.
//!
//! Options fall in two groups. Init-time options (location, encoding,
//! separator, entry syntax, match strategy) shape the built dictionary and
//! only take effect on the next `init`/`reinit`. Run-time options (longest
//! match, feature toggles, annotation set) are read on every execution.

use std::path::Path;

use gazetteer_lists::{Encoding, resource, unescape_separator};
use serde::{Deserialize, Serialize};

use crate::{GazetteerError, Result};

/// How list entries are turned into patterns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySyntax {
    /// Entries are literal text.
    #[default]
    Literal,
    /// Entries are regular expressions, used as written.
    Pattern,
}

/// Which matcher scans documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// One boundary-anchored regex scan per entry.
    #[default]
    Pattern,
    /// A single walk of the automaton over the text.
    Automaton,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazetteerConfig {
    /// Path or `file://` URL of the definition file.
    pub lists_location: Option<String>,
    /// WHATWG label of the list file encoding.
    pub encoding: String,
    pub longest_match_only: bool,
    pub add_string_feature: bool,
    pub add_entry_feature: bool,
    /// Target annotation set; `None` or empty means the default set.
    pub annotation_set_name: Option<String>,
    /// Separator between a list entry and its features. Accepts `\t`-style
    /// escapes; empty disables inline features.
    pub feature_separator: String,
    pub entry_syntax: EntrySyntax,
    pub match_strategy: MatchStrategy,
}

impl Default for GazetteerConfig {
    fn default() -> Self {
        Self {
            lists_location: None,
            encoding: "UTF-8".to_string(),
            longest_match_only: true,
            add_string_feature: true,
            add_entry_feature: true,
            annotation_set_name: None,
            feature_separator: ":".to_string(),
            entry_syntax: EntrySyntax::Literal,
            match_strategy: MatchStrategy::Pattern,
        }
    }
}

impl GazetteerConfig {
    pub fn with_lists(location: impl Into<String>) -> Self {
        Self {
            lists_location: Some(location.into()),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| GazetteerError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| GazetteerError::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&text)
            .map_err(|e| GazetteerError::Config(format!("{}: {e}", path.display())))
    }

    /// The feature separator with escapes expanded, if inline features are on.
    pub fn separator(&self) -> Option<String> {
        let separator = unescape_separator(&self.feature_separator);
        (!separator.is_empty()).then_some(separator)
    }

    pub fn list_encoding(&self) -> Result<&'static Encoding> {
        Ok(resource::encoding_for_label(&self.encoding)?)
    }

    /// The annotation set to write to, `None` for the default set.
    pub fn target_set(&self) -> Option<&str> {
        self.annotation_set_name.as_deref().filter(|name| !name.is_empty())
    }

    /// Reject combinations the build cannot honor.
    pub fn validate(&self) -> Result<()> {
        check_strategy(self.entry_syntax, self.match_strategy)?;
        self.list_encoding()?;
        Ok(())
    }
}

/// The automaton only walks literal text, so it cannot serve pattern entries.
pub(crate) fn check_strategy(syntax: EntrySyntax, strategy: MatchStrategy) -> Result<()> {
    if strategy == MatchStrategy::Automaton && syntax == EntrySyntax::Pattern {
        return Err(GazetteerError::Config(
            "pattern entries cannot be matched with the automaton strategy".to_string(),
        ));
    }
    Ok(())
}
