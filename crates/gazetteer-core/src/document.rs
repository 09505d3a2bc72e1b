//! Documents and the annotation sets the engine writes into.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use gazetteer_lists::FeatureMap;
use serde::Serialize;

pub type AnnotationId = u64;

/// A typed span over document text, in UTF-8 byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub annotation_type: String,
    pub features: FeatureMap,
}

/// The annotation operations the matcher relies on.
pub trait AnnotationIndex {
    fn insert(
        &mut self,
        start: usize,
        end: usize,
        annotation_type: &str,
        features: FeatureMap,
    ) -> AnnotationId;

    /// Annotations of `annotation_type` spanning all of `[start, end)`.
    fn covering(&self, annotation_type: &str, start: usize, end: usize) -> Vec<AnnotationId>;

    /// Annotations of `annotation_type` lying entirely within `[start, end)`.
    fn contained(&self, annotation_type: &str, start: usize, end: usize) -> Vec<AnnotationId>;

    /// Remove the given annotations, returning how many were present.
    fn remove_all(&mut self, ids: &[AnnotationId]) -> usize;
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationSet {
    annotations: BTreeMap<AnnotationId, Annotation>,
    by_type: HashMap<String, SpanIndex>,
    next_id: AnnotationId,
}

/// Annotations of one type keyed by `(start, end)`.
///
/// `longest` never shrinks, so a covering query only has to look at spans
/// starting within `longest` bytes before the queried end.
#[derive(Debug, Clone, Default)]
struct SpanIndex {
    spans: BTreeMap<(usize, usize), BTreeSet<AnnotationId>>,
    longest: usize,
}

impl SpanIndex {
    fn add(&mut self, start: usize, end: usize, id: AnnotationId) {
        self.spans.entry((start, end)).or_default().insert(id);
        self.longest = self.longest.max(end.saturating_sub(start));
    }

    fn remove(&mut self, start: usize, end: usize, id: AnnotationId) {
        if let Some(ids) = self.spans.get_mut(&(start, end)) {
            ids.remove(&id);
            if ids.is_empty() {
                self.spans.remove(&(start, end));
            }
        }
    }

    fn covering(&self, start: usize, end: usize) -> Vec<AnnotationId> {
        let from = end.saturating_sub(self.longest);
        if from > start {
            return Vec::new();
        }
        collect_ids(
            self.spans
                .range((from, 0)..=(start, usize::MAX))
                .filter(|((_, e), _)| *e >= end),
        )
    }

    fn contained(&self, start: usize, end: usize) -> Vec<AnnotationId> {
        if start > end {
            return Vec::new();
        }
        collect_ids(
            self.spans
                .range((start, 0)..=(end, usize::MAX))
                .filter(|((_, e), _)| *e <= end),
        )
    }
}

fn collect_ids<'a>(
    spans: impl Iterator<Item = (&'a (usize, usize), &'a BTreeSet<AnnotationId>)>,
) -> Vec<AnnotationId> {
    let mut ids: Vec<_> = spans.flat_map(|(_, ids)| ids.iter().copied()).collect();
    ids.sort_unstable();
    ids
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.get(&id)
    }

    /// Annotations in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.values()
    }

    /// Annotations ordered by start, then longer spans first, then id.
    pub fn sorted(&self) -> Vec<&Annotation> {
        let mut annotations: Vec<_> = self.annotations.values().collect();
        annotations.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then(b.end.cmp(&a.end))
                .then(a.id.cmp(&b.id))
        });
        annotations
    }

    pub fn of_type<'a>(&'a self, annotation_type: &'a str) -> impl Iterator<Item = &'a Annotation> {
        self.iter().filter(move |a| a.annotation_type == annotation_type)
    }

    pub fn types(&self) -> BTreeSet<&str> {
        self.iter().map(|a| a.annotation_type.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn clear(&mut self) {
        self.annotations.clear();
        self.by_type.clear();
    }
}

impl AnnotationIndex for AnnotationSet {
    fn insert(
        &mut self,
        start: usize,
        end: usize,
        annotation_type: &str,
        features: FeatureMap,
    ) -> AnnotationId {
        let id = self.next_id;
        self.next_id += 1;
        self.by_type
            .entry(annotation_type.to_string())
            .or_default()
            .add(start, end, id);
        self.annotations.insert(
            id,
            Annotation {
                id,
                start,
                end,
                annotation_type: annotation_type.to_string(),
                features,
            },
        );
        id
    }

    fn covering(&self, annotation_type: &str, start: usize, end: usize) -> Vec<AnnotationId> {
        self.by_type
            .get(annotation_type)
            .map(|index| index.covering(start, end))
            .unwrap_or_default()
    }

    fn contained(&self, annotation_type: &str, start: usize, end: usize) -> Vec<AnnotationId> {
        self.by_type
            .get(annotation_type)
            .map(|index| index.contained(start, end))
            .unwrap_or_default()
    }

    fn remove_all(&mut self, ids: &[AnnotationId]) -> usize {
        let mut removed = 0;
        for id in ids {
            let Some(annotation) = self.annotations.remove(id) else {
                continue;
            };
            if let Some(index) = self.by_type.get_mut(&annotation.annotation_type) {
                index.remove(annotation.start, annotation.end, annotation.id);
            }
            removed += 1;
        }
        removed
    }
}

/// Text with a default annotation set and any number of named sets.
#[derive(Debug, Clone, Default)]
pub struct Document {
    text: String,
    annotations: AnnotationSet,
    named: BTreeMap<String, AnnotationSet>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The default annotation set.
    pub fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut AnnotationSet {
        &mut self.annotations
    }

    pub fn named(&self, name: &str) -> Option<&AnnotationSet> {
        self.named.get(name)
    }

    /// The named set, created empty on first use.
    pub fn named_mut(&mut self, name: &str) -> &mut AnnotationSet {
        self.named.entry(name.to_string()).or_default()
    }

    pub fn set_names(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }

    /// The text together with a mutable target set: the named set when
    /// `set` is given, otherwise the default set.
    pub fn split_mut(&mut self, set: Option<&str>) -> (&str, &mut AnnotationSet) {
        let target = match set {
            Some(name) => self.named.entry(name.to_string()).or_default(),
            None => &mut self.annotations,
        };
        (&self.text, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_with(spans: &[(usize, usize, &str)]) -> AnnotationSet {
        let mut set = AnnotationSet::new();
        for &(start, end, ty) in spans {
            set.insert(start, end, ty, FeatureMap::new());
        }
        set
    }

    #[test]
    fn covering_and_contained_are_type_scoped() {
        let set = set_with(&[(0, 11, "Lookup"), (0, 6, "Lookup"), (0, 11, "City")]);

        assert_eq!(set.covering("Lookup", 0, 6), vec![0, 1]);
        assert_eq!(set.covering("Lookup", 2, 11), vec![0]);
        assert_eq!(set.covering("City", 0, 6), vec![2]);
        assert!(set.covering("Other", 0, 1).is_empty());

        assert_eq!(set.contained("Lookup", 0, 11), vec![0, 1]);
        assert_eq!(set.contained("Lookup", 0, 10), vec![1]);
        assert!(set.contained("City", 1, 11).is_empty());
    }

    #[test]
    fn remove_all_counts_present_ids() {
        let mut set = set_with(&[(0, 1, "A"), (1, 2, "A"), (2, 3, "B")]);
        assert_eq!(set.remove_all(&[0, 2, 42]), 2);
        assert_eq!(set.len(), 1);
        assert_eq!(set.types(), BTreeSet::from(["A"]));

        // Ids are never reused.
        let id = set.insert(5, 6, "A", FeatureMap::new());
        assert_eq!(id, 3);
    }

    #[test]
    fn queries_skip_removed_and_partially_overlapping_spans() {
        let mut set = set_with(&[(0, 8, "A"), (4, 13, "A"), (9, 13, "A"), (0, 13, "B")]);

        assert_eq!(set.covering("A", 9, 13), vec![1, 2]);
        assert!(set.covering("A", 0, 13).is_empty());
        assert_eq!(set.contained("A", 0, 13), vec![0, 1, 2]);
        assert_eq!(set.contained("A", 4, 13), vec![1, 2]);

        set.remove_all(&[1]);
        assert_eq!(set.covering("A", 9, 13), vec![2]);
        assert_eq!(set.contained("A", 0, 13), vec![0, 2]);

        set.clear();
        assert!(set.covering("B", 0, 13).is_empty());
    }

    #[test]
    fn covering_looks_back_as_far_as_the_longest_span() {
        let mut set = AnnotationSet::new();
        for i in 0..1000 {
            set.insert(i * 10, i * 10 + 3, "A", FeatureMap::new());
        }
        let long = set.insert(5000, 6000, "A", FeatureMap::new());
        assert_eq!(set.covering("A", 5990, 5993), vec![599, long]);
        assert_eq!(set.covering("A", 9990, 9992), vec![999]);
        assert!(set.covering("A", 9995, 9996).is_empty());
    }

    #[test]
    fn sorted_puts_longer_spans_first() {
        let set = set_with(&[(4, 6, "A"), (0, 3, "A"), (0, 9, "A")]);
        let spans: Vec<_> = set.sorted().iter().map(|a| (a.start, a.end)).collect();
        assert_eq!(spans, vec![(0, 9), (0, 3), (4, 6)]);
    }

    #[test]
    fn named_sets_are_created_on_demand() {
        let mut doc = Document::new("madrid");
        assert!(doc.named("gaz").is_none());

        let (text, set) = doc.split_mut(Some("gaz"));
        set.insert(0, text.len(), "Lookup", FeatureMap::new());

        assert_eq!(doc.named("gaz").map(AnnotationSet::len), Some(1));
        assert!(doc.annotations().is_empty());
        assert_eq!(doc.set_names().collect::<Vec<_>>(), vec!["gaz"]);
    }

    #[test]
    fn annotations_serialize_with_type_key() {
        let mut set = AnnotationSet::new();
        let features = FeatureMap::from([("majorType".to_string(), "city".to_string())]);
        set.insert(0, 6, "Lookup", features);
        let json = serde_json::to_value(set.get(0).unwrap()).unwrap();
        assert_eq!(json["type"], "Lookup");
        assert_eq!(json["features"]["majorType"], "city");
        assert_eq!(json["end"], 6);
    }
}
