//! What to emit for a dictionary match.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use gazetteer_lists::{FeatureMap, ListEntryDescriptor};

/// The labels and features attached to one dictionary entry.
///
/// Identity is the canonical string `major[.minor[.languages]]` followed by
/// `|key:value` for every feature in key order. Two lookups with the same
/// canonical string compare equal even when they come from different lists
/// or carry different annotation types, so an automaton state holds at most
/// one of them.
#[derive(Debug, Clone)]
pub struct Lookup {
    list: String,
    major_type: String,
    minor_type: Option<String>,
    languages: Option<String>,
    annotation_type: String,
    features: Option<FeatureMap>,
    canonical: String,
}

impl Lookup {
    pub fn new(descriptor: &ListEntryDescriptor) -> Self {
        Self::build(descriptor, None)
    }

    pub fn with_features(descriptor: &ListEntryDescriptor, features: FeatureMap) -> Self {
        Self::build(descriptor, Some(features))
    }

    fn build(descriptor: &ListEntryDescriptor, features: Option<FeatureMap>) -> Self {
        let mut lookup = Self {
            list: descriptor.list().to_string(),
            major_type: descriptor.major_type().to_string(),
            minor_type: descriptor.minor_type().map(str::to_string),
            languages: descriptor.language().map(str::to_string),
            annotation_type: descriptor.annotation_type().to_string(),
            features,
            canonical: String::new(),
        };
        lookup.canonical = lookup.canonical_form();
        lookup
    }

    fn canonical_form(&self) -> String {
        let mut out = self.major_type.clone();
        if let Some(minor) = &self.minor_type {
            out.push('.');
            out.push_str(minor);
            if let Some(languages) = &self.languages {
                out.push('.');
                out.push_str(languages);
            }
        }
        // BTreeMap iterates in key order.
        for (key, value) in self.features.iter().flatten() {
            out.push('|');
            out.push_str(key);
            out.push(':');
            out.push_str(value);
        }
        out
    }

    pub fn list(&self) -> &str {
        &self.list
    }

    pub fn major_type(&self) -> &str {
        &self.major_type
    }

    pub fn minor_type(&self) -> Option<&str> {
        self.minor_type.as_deref()
    }

    pub fn languages(&self) -> Option<&str> {
        self.languages.as_deref()
    }

    pub fn annotation_type(&self) -> &str {
        &self.annotation_type
    }

    pub fn features(&self) -> Option<&FeatureMap> {
        self.features.as_ref()
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl PartialEq for Lookup {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Lookup {}

impl Hash for Lookup {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl PartialOrd for Lookup {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Lookup {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn descriptor(line: &str) -> ListEntryDescriptor {
        line.parse().unwrap()
    }

    #[test]
    fn canonical_form_nests_minor_and_languages() {
        assert_eq!(Lookup::new(&descriptor("a.lst:location")).to_string(), "location");
        assert_eq!(
            Lookup::new(&descriptor("a.lst:location:city")).to_string(),
            "location.city"
        );
        assert_eq!(
            Lookup::new(&descriptor("a.lst:location:city:en")).to_string(),
            "location.city.en"
        );
        // Languages only appear after a minor type.
        assert_eq!(Lookup::new(&descriptor("a.lst:greeting::es")).to_string(), "greeting");
    }

    #[test]
    fn features_are_sorted_by_key() {
        let features = FeatureMap::from([
            ("zone".to_string(), "CET".to_string()),
            ("country".to_string(), "ES".to_string()),
        ]);
        let lookup = Lookup::with_features(&descriptor("a.lst:location:city"), features);
        assert_eq!(lookup.canonical(), "location.city|country:ES|zone:CET");
    }

    #[test]
    fn identity_is_the_canonical_form() {
        let city = Lookup::new(&descriptor("a.lst:location:city::City"));
        let lookup = Lookup::new(&descriptor("b.lst:location:city"));
        assert_eq!(city, lookup);
        assert_eq!(city.annotation_type(), "City");
        assert_eq!(lookup.annotation_type(), "Lookup");

        let set: HashSet<_> = [city, lookup].into_iter().collect();
        assert_eq!(set.len(), 1);

        assert_ne!(
            Lookup::new(&descriptor("a.lst:location:city")),
            Lookup::new(&descriptor("a.lst:location:town"))
        );
    }
}
