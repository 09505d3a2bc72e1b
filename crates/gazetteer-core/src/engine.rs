//! The matching engine.

use std::sync::Arc;

use gazetteer_lists::{FeatureMap, ListEntryDescriptor};

use crate::config::{GazetteerConfig, MatchStrategy};
use crate::dictionary::{BuildProgress, Dictionary, DictionaryState};
use crate::document::{AnnotationIndex, Document};
use crate::events::{GazetteerEvent, ListenerId, Listeners};
use crate::features;
use crate::lookup::Lookup;
use crate::{GazetteerError, Result};

/// Annotates documents with the dictionary entries they contain.
///
/// An engine starts unbuilt. [`Gazetteer::init`] builds its dictionary;
/// [`Gazetteer::duplicate`] hands out further engines over the same
/// dictionary without reading anything again. Run-time options can be
/// changed between executions; init-time options apply at the next build.
#[derive(Debug, Default)]
pub struct Gazetteer {
    config: GazetteerConfig,
    state: DictionaryState,
    listeners: Listeners,
}

impl Gazetteer {
    pub fn new(config: GazetteerConfig) -> Self {
        Self {
            config,
            state: DictionaryState::Unbuilt,
            listeners: Listeners::default(),
        }
    }

    /// An engine over an already built dictionary. It can scan at once but
    /// can never modify the dictionary.
    pub fn from_shared(dictionary: Arc<Dictionary>, config: GazetteerConfig) -> Self {
        Self {
            config,
            state: DictionaryState::Shared(dictionary),
            listeners: Listeners::default(),
        }
    }

    pub fn config(&self) -> &GazetteerConfig {
        &self.config
    }

    /// Changes to init-time options take effect at the next `init`/`reinit`.
    pub fn config_mut(&mut self) -> &mut GazetteerConfig {
        &mut self.config
    }

    pub fn state(&self) -> &DictionaryState {
        &self.state
    }

    pub fn is_built(&self) -> bool {
        self.state.is_built()
    }

    /// Load the definition and build the dictionary.
    pub fn init(&mut self) -> Result<()> {
        self.init_with_progress(|_| {})
    }

    /// Like [`Gazetteer::init`], reporting progress as lists are added.
    ///
    /// On error the engine keeps whatever dictionary it had before.
    pub fn init_with_progress(&mut self, progress: impl FnMut(BuildProgress)) -> Result<()> {
        if self.state.is_shared() {
            return Err(GazetteerError::State(
                "cannot build a dictionary in a shared engine".to_string(),
            ));
        }
        let dictionary = Dictionary::build_with_progress(&self.config, progress)?;
        self.state = DictionaryState::Owned(Arc::new(dictionary));
        Ok(())
    }

    /// Rebuild from the configured location and notify listeners.
    ///
    /// Engines duplicated earlier keep the dictionary they were given.
    pub fn reinit(&mut self) -> Result<()> {
        self.init()?;
        let dictionary = self.dictionary()?;
        let event = GazetteerEvent::Reinit {
            lists: dictionary.num_lists(),
            entries: dictionary.num_entries(),
        };
        tracing::info!(?event, "gazetteer reinitialised");
        self.listeners.notify(&event);
        Ok(())
    }

    /// A new engine sharing this engine's dictionary and configuration.
    /// Listeners are not copied.
    pub fn duplicate(&self) -> Result<Self> {
        let dictionary = self.state.dictionary().ok_or_else(|| {
            GazetteerError::State("cannot duplicate a gazetteer that was never built".to_string())
        })?;
        Ok(Self::from_shared(Arc::clone(dictionary), self.config.clone()))
    }

    pub fn dictionary(&self) -> Result<&Arc<Dictionary>> {
        self.state
            .dictionary()
            .ok_or_else(|| GazetteerError::State("gazetteer has not been built".to_string()))
    }

    /// Mutable access to an owned dictionary that no other engine holds.
    pub fn dictionary_mut(&mut self) -> Result<&mut Dictionary> {
        match &mut self.state {
            DictionaryState::Unbuilt => {
                Err(GazetteerError::State("gazetteer has not been built".to_string()))
            }
            DictionaryState::Shared(_) => Err(GazetteerError::State(
                "dictionary is borrowed from another gazetteer".to_string(),
            )),
            DictionaryState::Owned(dictionary) => Arc::get_mut(dictionary).ok_or_else(|| {
                GazetteerError::State("dictionary is shared with duplicated gazetteers".to_string())
            }),
        }
    }

    /// Load one more list into this engine's dictionary.
    pub fn add_list(&mut self, descriptor: ListEntryDescriptor) -> Result<bool> {
        self.dictionary_mut()?.add_list(descriptor)
    }

    pub fn set_longest_match_only(&mut self, on: bool) {
        self.config.longest_match_only = on;
    }

    pub fn set_add_string_feature(&mut self, on: bool) {
        self.config.add_string_feature = on;
    }

    pub fn set_add_entry_feature(&mut self, on: bool) {
        self.config.add_entry_feature = on;
    }

    pub fn set_annotation_set_name(&mut self, name: Option<String>) {
        self.config.annotation_set_name = name;
    }

    pub fn add_listener(
        &mut self,
        listener: impl FnMut(&GazetteerEvent) + Send + 'static,
    ) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Annotate `document` in the configured annotation set.
    ///
    /// Returns the number of annotations added. Some of them may since have
    /// been replaced by longer matches.
    pub fn execute(&self, document: &mut Document) -> Result<usize> {
        let (text, annotations) = document.split_mut(self.config.target_set());
        self.annotate(text, annotations)
    }

    /// Annotate `text` into any annotation index.
    pub fn annotate(&self, text: &str, index: &mut impl AnnotationIndex) -> Result<usize> {
        let dictionary = self.dictionary()?;
        let added = match dictionary.match_strategy() {
            MatchStrategy::Pattern => self.scan_patterns(dictionary, text, index),
            MatchStrategy::Automaton => self.scan_automaton(dictionary, text, index),
        };
        tracing::debug!(
            bytes = text.len(),
            added,
            strategy = ?dictionary.match_strategy(),
            "look-up complete"
        );
        Ok(added)
    }

    /// Lists in definition order, entries in list order, matches left to
    /// right. The result depends on this order when matches of one type
    /// overlap without nesting.
    fn scan_patterns(
        &self,
        dictionary: &Dictionary,
        text: &str,
        index: &mut impl AnnotationIndex,
    ) -> usize {
        let mut added = 0;
        for list in dictionary.compiled_lists() {
            for entry in &list.entries {
                let Some(regex) = &entry.regex else {
                    continue;
                };
                for found in regex.find_iter(text) {
                    if found.is_empty() {
                        continue;
                    }
                    if self.emit(index, &entry.lookup, &entry.text, text, found.start(), found.end()) {
                        added += 1;
                    }
                }
            }
        }
        added
    }

    fn scan_automaton(
        &self,
        dictionary: &Dictionary,
        text: &str,
        index: &mut impl AnnotationIndex,
    ) -> usize {
        let automaton = dictionary.automaton();
        let mut added = 0;
        for found in automaton.find_matches(text) {
            let Some(lookups) = automaton.lookups(found.state) else {
                continue;
            };
            let entry = automaton
                .entry(found.state)
                .unwrap_or(&text[found.start..found.end]);
            for lookup in lookups {
                if self.emit(index, lookup, entry, text, found.start, found.end) {
                    added += 1;
                }
            }
        }
        added
    }

    /// Apply the longest-match rule and add one annotation. Returns false
    /// when the match was suppressed.
    fn emit(
        &self,
        index: &mut impl AnnotationIndex,
        lookup: &Lookup,
        entry: &str,
        text: &str,
        start: usize,
        end: usize,
    ) -> bool {
        let annotation_type = lookup.annotation_type();
        if self.config.longest_match_only {
            if !index.covering(annotation_type, start, end).is_empty() {
                return false;
            }
            let contained = index.contained(annotation_type, start, end);
            if !contained.is_empty() {
                index.remove_all(&contained);
            }
        }

        let mut fm = FeatureMap::new();
        fm.insert(features::MAJOR_TYPE.to_string(), lookup.major_type().to_string());
        if let Some(minor) = lookup.minor_type() {
            fm.insert(features::MINOR_TYPE.to_string(), minor.to_string());
        }
        if let Some(language) = lookup.languages() {
            fm.insert(features::LANGUAGE.to_string(), language.to_string());
        }
        if let Some(extra) = lookup.features() {
            fm.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if self.config.add_string_feature {
            fm.insert(features::STRING.to_string(), text[start..end].to_string());
        }
        if self.config.add_entry_feature {
            fm.insert(features::ENTRY.to_string(), entry.to_string());
        }
        index.insert(start, end, annotation_type, fm);
        true
    }
}
