//! Dictionary lookup over natural-language text.
//!
//! A [`Gazetteer`] loads a definition file and its lists (see
//! [`gazetteer_lists`]), builds an [`Automaton`] over every entry and then
//! annotates documents with the spans that match a dictionary entry. Matches
//! of the same annotation type obey a longest-match-wins policy unless that
//! is switched off.
//!
//! The built state lives in an [`Arc<Dictionary>`](Dictionary) that any
//! number of engines can share, one per worker:
//!
//! ```no_run
//! use gazetteer_core::{Document, Gazetteer, GazetteerConfig};
//!
//! # fn main() -> gazetteer_core::Result<()> {
//! let mut gazetteer = Gazetteer::new(GazetteerConfig::with_lists("gaz/lists.def"));
//! gazetteer.init()?;
//!
//! let worker = gazetteer.duplicate()?;
//! let mut doc = Document::new("buenos días, madrid");
//! worker.execute(&mut doc)?;
//! # Ok(())
//! # }
//! ```

pub mod automaton;
pub mod config;
pub mod dictionary;
pub mod document;
pub mod engine;
pub mod events;
pub mod lookup;
pub mod pattern;

pub use automaton::{Automaton, AutomatonMatch, StateId};
pub use config::{EntrySyntax, GazetteerConfig, MatchStrategy};
pub use dictionary::{BuildProgress, Dictionary, DictionaryState};
pub use document::{Annotation, AnnotationId, AnnotationIndex, AnnotationSet, Document};
pub use engine::Gazetteer;
pub use events::{GazetteerEvent, ListenerId};
pub use lookup::Lookup;

pub use gazetteer_lists::ListsError;

/// Feature names written onto emitted annotations.
pub mod features {
    pub const MAJOR_TYPE: &str = "majorType";
    pub const MINOR_TYPE: &str = "minorType";
    pub const LANGUAGE: &str = "language";
    /// The document text covered by the match.
    pub const STRING: &str = "string";
    /// The dictionary entry that produced the match.
    pub const ENTRY: &str = "gazEntry";
}

#[derive(Debug, thiserror::Error)]
pub enum GazetteerError {
    #[error(transparent)]
    Lists(#[from] ListsError),

    /// The engine is not in a state that allows the operation.
    #[error("invalid state: {0}")]
    State(String),

    #[error("entry {entry:?} in {list} is not a valid pattern: {source}")]
    Pattern {
        list: String,
        entry: String,
        #[source]
        source: regex::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = GazetteerError> = std::result::Result<T, E>;
