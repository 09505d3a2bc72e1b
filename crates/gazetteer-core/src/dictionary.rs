//! The built, read-only state behind a gazetteer.

use std::path::PathBuf;
use std::sync::Arc;

use gazetteer_lists::{Definition, DictionaryList, ListEntryDescriptor, ListsError, resource};
use regex::Regex;

use crate::automaton::Automaton;
use crate::config::{EntrySyntax, GazetteerConfig, MatchStrategy, check_strategy};
use crate::lookup::Lookup;
use crate::pattern;
use crate::{GazetteerError, Result};

/// Progress events reported while a dictionary is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildProgress {
    /// Reading the definition file and the lists it names.
    LoadingDefinition { location: PathBuf },
    /// Adding the entries of one list; `index` counts from 1.
    ReadingList {
        list: String,
        index: usize,
        total: usize,
    },
    Complete {
        lists: usize,
        entries: usize,
        states: usize,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledEntry {
    pub text: String,
    pub lookup: Lookup,
    /// Present only when the dictionary scans with patterns.
    pub regex: Option<Regex>,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledList {
    pub descriptor: ListEntryDescriptor,
    pub entries: Vec<CompiledEntry>,
}

/// Definition, lists, automaton and compiled patterns of one gazetteer.
///
/// Once built a dictionary is normally wrapped in an [`Arc`] and never
/// changed again, which is what lets engines share it across threads.
#[derive(Debug, Clone)]
pub struct Dictionary {
    definition: Definition,
    automaton: Automaton,
    lists: Vec<CompiledList>,
    entry_syntax: EntrySyntax,
    match_strategy: MatchStrategy,
}

impl Dictionary {
    /// A dictionary with no lists.
    pub fn empty(entry_syntax: EntrySyntax, match_strategy: MatchStrategy) -> Self {
        Self {
            definition: Definition::new(),
            automaton: Automaton::new(),
            lists: Vec::new(),
            entry_syntax,
            match_strategy,
        }
    }

    /// Load the configured definition and build from it.
    pub fn build(config: &GazetteerConfig) -> Result<Self> {
        Self::build_with_progress(config, |_| {})
    }

    pub fn build_with_progress(
        config: &GazetteerConfig,
        mut progress: impl FnMut(BuildProgress),
    ) -> Result<Self> {
        config.validate()?;
        let location = config
            .lists_location
            .as_deref()
            .filter(|location| !location.trim().is_empty())
            .ok_or_else(|| ListsError::Resource {
                location: "<unset>".to_string(),
                reason: "no lists location configured".to_string(),
            })?;
        let path = resource::resolve_location(location)?;

        progress(BuildProgress::LoadingDefinition {
            location: path.clone(),
        });
        let mut definition = Definition::with_location(path);
        definition.set_list_encoding(config.list_encoding()?);
        definition.set_separator(config.separator());
        definition.load()?;

        Self::compile(
            definition,
            config.entry_syntax,
            config.match_strategy,
            &mut progress,
        )
    }

    /// Build from a definition whose lists are already loaded.
    pub fn from_definition(
        definition: Definition,
        entry_syntax: EntrySyntax,
        match_strategy: MatchStrategy,
    ) -> Result<Self> {
        Self::compile(definition, entry_syntax, match_strategy, &mut |_| {})
    }

    fn compile(
        definition: Definition,
        entry_syntax: EntrySyntax,
        match_strategy: MatchStrategy,
        progress: &mut impl FnMut(BuildProgress),
    ) -> Result<Self> {
        check_strategy(entry_syntax, match_strategy)?;
        let mut dictionary = Self::empty(entry_syntax, match_strategy);
        let total = definition.len();
        for (idx, (descriptor, list)) in definition.lists().enumerate() {
            progress(BuildProgress::ReadingList {
                list: descriptor.list().to_string(),
                index: idx + 1,
                total,
            });
            dictionary.push_list(descriptor, list)?;
        }
        dictionary.definition = definition;

        let entries = dictionary.num_entries();
        tracing::info!(
            lists = total,
            entries,
            states = dictionary.automaton.num_states(),
            "gazetteer built"
        );
        progress(BuildProgress::Complete {
            lists: total,
            entries,
            states: dictionary.automaton.num_states(),
        });
        Ok(dictionary)
    }

    /// Add one list by loading it relative to the definition file.
    ///
    /// Returns `Ok(false)` if the list name is already present. On error
    /// nothing is changed.
    pub fn add_list(&mut self, descriptor: ListEntryDescriptor) -> Result<bool> {
        if !self.definition.add(descriptor.clone())? {
            return Ok(false);
        }
        self.compile_added(&descriptor)
    }

    /// Add one list held in memory.
    pub fn add_list_with(
        &mut self,
        descriptor: ListEntryDescriptor,
        list: DictionaryList,
    ) -> Result<bool> {
        if !self.definition.add_with_list(descriptor.clone(), list) {
            return Ok(false);
        }
        self.compile_added(&descriptor)
    }

    fn compile_added(&mut self, descriptor: &ListEntryDescriptor) -> Result<bool> {
        let Some(list) = self.definition.list_for(descriptor).cloned() else {
            return Err(GazetteerError::State(format!(
                "list {} missing after it was added",
                descriptor.list()
            )));
        };
        if let Err(e) = self.push_list(descriptor, &list) {
            self.definition.remove(descriptor);
            return Err(e);
        }
        Ok(true)
    }

    /// Compile every entry first so a bad pattern leaves the automaton as it was.
    fn push_list(&mut self, descriptor: &ListEntryDescriptor, list: &DictionaryList) -> Result<()> {
        let default_lookup = Lookup::new(descriptor);
        let mut entries = Vec::with_capacity(list.len());
        for entry in list.iter().filter(|entry| !entry.text().is_empty()) {
            let lookup = match entry.features() {
                Some(features) => Lookup::with_features(descriptor, features.clone()),
                None => default_lookup.clone(),
            };
            let regex = match self.match_strategy {
                MatchStrategy::Pattern => Some(
                    pattern::compile_entry(entry.text(), self.entry_syntax).map_err(|source| {
                        GazetteerError::Pattern {
                            list: descriptor.list().to_string(),
                            entry: entry.text().to_string(),
                            source,
                        }
                    })?,
                ),
                MatchStrategy::Automaton => None,
            };
            entries.push(CompiledEntry {
                text: entry.text().to_string(),
                lookup,
                regex,
            });
        }

        for entry in &entries {
            self.automaton.insert(&entry.text, entry.lookup.clone());
        }
        tracing::debug!(
            list = descriptor.list(),
            entries = entries.len(),
            "list added to gazetteer"
        );
        self.lists.push(CompiledList {
            descriptor: descriptor.clone(),
            entries,
        });
        Ok(())
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn automaton(&self) -> &Automaton {
        &self.automaton
    }

    pub fn entry_syntax(&self) -> EntrySyntax {
        self.entry_syntax
    }

    pub fn match_strategy(&self) -> MatchStrategy {
        self.match_strategy
    }

    pub fn num_lists(&self) -> usize {
        self.lists.len()
    }

    pub fn num_entries(&self) -> usize {
        self.lists.iter().map(|list| list.entries.len()).sum()
    }

    pub(crate) fn compiled_lists(&self) -> &[CompiledList] {
        &self.lists
    }
}

/// Where an engine's dictionary comes from.
#[derive(Debug, Clone, Default)]
pub enum DictionaryState {
    #[default]
    Unbuilt,
    /// Built by this engine.
    Owned(Arc<Dictionary>),
    /// Borrowed from another engine; never modified through this one.
    Shared(Arc<Dictionary>),
}

impl DictionaryState {
    pub fn dictionary(&self) -> Option<&Arc<Dictionary>> {
        match self {
            Self::Unbuilt => None,
            Self::Owned(dictionary) | Self::Shared(dictionary) => Some(dictionary),
        }
    }

    pub fn is_built(&self) -> bool {
        !matches!(self, Self::Unbuilt)
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }
}
