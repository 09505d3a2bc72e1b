//! One line of a definition file.

use std::fmt;
use std::str::FromStr;

use crate::ListsError;

/// Annotation type used when a definition line does not name one.
pub const DEFAULT_ANNOTATION_TYPE: &str = "Lookup";

const SEPARATOR: char = ':';

/// Maps one list file to the labels attached to its matches.
///
/// Serialized as `list:major[:minor[:language[:annotationType]]]`. Empty
/// trailing fields are dropped and the default annotation type is never
/// written out.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListEntryDescriptor {
    list: String,
    major_type: String,
    minor_type: Option<String>,
    language: Option<String>,
    annotation_type: String,
}

impl ListEntryDescriptor {
    pub fn new(list: impl Into<String>, major_type: impl Into<String>) -> Self {
        Self {
            list: list.into(),
            major_type: major_type.into(),
            minor_type: None,
            language: None,
            annotation_type: DEFAULT_ANNOTATION_TYPE.to_string(),
        }
    }

    pub fn with_minor_type(mut self, minor_type: impl Into<String>) -> Self {
        self.minor_type = non_empty(minor_type.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = non_empty(language.into());
        self
    }

    /// An empty annotation type falls back to [`DEFAULT_ANNOTATION_TYPE`].
    pub fn with_annotation_type(mut self, annotation_type: impl Into<String>) -> Self {
        self.annotation_type = non_empty(annotation_type.into())
            .unwrap_or_else(|| DEFAULT_ANNOTATION_TYPE.to_string());
        self
    }

    /// The list file name, relative to the definition file.
    pub fn list(&self) -> &str {
        &self.list
    }

    pub fn major_type(&self) -> &str {
        &self.major_type
    }

    pub fn minor_type(&self) -> Option<&str> {
        self.minor_type.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn annotation_type(&self) -> &str {
        &self.annotation_type
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

impl FromStr for ListEntryDescriptor {
    type Err = ListsError;

    /// Parse a definition line.
    ///
    /// Everything after the fourth separator belongs to the annotation type.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let Some((list, rest)) = line.split_once(SEPARATOR) else {
            return Err(ListsError::format(line, "missing ':' after the list name"));
        };
        if list.is_empty() {
            return Err(ListsError::format(line, "empty list name"));
        }

        let mut fields = rest.splitn(4, SEPARATOR);
        let major_type = fields.next().unwrap_or_default();
        let mut descriptor = Self::new(list, major_type);
        if let Some(minor) = fields.next() {
            descriptor = descriptor.with_minor_type(minor);
        }
        if let Some(language) = fields.next() {
            descriptor = descriptor.with_language(language);
        }
        if let Some(annotation_type) = fields.next() {
            descriptor = descriptor.with_annotation_type(annotation_type);
        }
        Ok(descriptor)
    }
}

impl fmt::Display for ListEntryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let annotation_type = if self.annotation_type == DEFAULT_ANNOTATION_TYPE {
            ""
        } else {
            &self.annotation_type
        };
        let mut fields = vec![
            self.list.as_str(),
            self.major_type.as_str(),
            self.minor_type.as_deref().unwrap_or_default(),
            self.language.as_deref().unwrap_or_default(),
            annotation_type,
        ];
        while fields.len() > 2 && fields.last().is_some_and(|field| field.is_empty()) {
            fields.pop();
        }
        f.write_str(&fields.join(":"))
    }
}
