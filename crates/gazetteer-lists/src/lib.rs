//! Definition files and dictionary lists for the gazetteer.
//!
//! A definition file (conventionally `lists.def`) names one list file per
//! line, together with the labels attached to every match from that list:
//!
//! ```text
//! city.lst:location:city:en:City
//! greetings.lst:greeting::es
//! words.lst:word
//! ```
//!
//! [`Definition`] reads such a file, parses each line into a
//! [`ListEntryDescriptor`] and eagerly loads the referenced
//! [`DictionaryList`]s. List files hold one entry per line, optionally
//! followed by inline features (`madrid@country=ES@capital=yes`).

pub mod definition;
pub mod descriptor;
pub mod list;
pub mod resource;

pub use definition::Definition;
pub use descriptor::{DEFAULT_ANNOTATION_TYPE, ListEntryDescriptor};
pub use list::{DictionaryList, FeatureMap, ListEntry, unescape_separator};

pub use encoding_rs::Encoding;

/// Errors raised while reading or writing definitions and lists.
#[derive(Debug, thiserror::Error)]
pub enum ListsError {
    /// A definition line that cannot be parsed into a descriptor.
    #[error("invalid definition line {line:?}: {reason}")]
    Format { line: String, reason: String },

    /// A resource that is missing, unreadable, unwritable or badly addressed.
    #[error("resource {location}: {reason}")]
    Resource { location: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ListsError {
    pub(crate) fn format(line: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            line: line.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn resource(location: impl ToString, reason: impl Into<String>) -> Self {
        Self::Resource {
            location: location.to_string(),
            reason: reason.into(),
        }
    }
}
