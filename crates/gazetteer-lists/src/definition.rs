//! The in-memory model of a definition file.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use encoding_rs::Encoding;

use crate::descriptor::ListEntryDescriptor;
use crate::list::DictionaryList;
use crate::{ListsError, resource};

/// Ordered descriptors, one per distinct list name, with their loaded lists.
///
/// Every descriptor added to a definition has its list loaded at the same
/// time, so a definition never holds a descriptor without a list. Lists are
/// held behind [`Arc`] and two list names that resolve to the same file
/// share one loaded list.
#[derive(Debug, Clone)]
pub struct Definition {
    location: Option<PathBuf>,
    encoding: &'static Encoding,
    separator: Option<String>,
    descriptors: Vec<ListEntryDescriptor>,
    lists: HashMap<String, Arc<DictionaryList>>,
    modified: bool,
}

impl Default for Definition {
    fn default() -> Self {
        Self {
            location: None,
            encoding: encoding_rs::UTF_8,
            separator: None,
            descriptors: Vec::new(),
            lists: HashMap::new(),
            modified: false,
        }
    }
}

impl Definition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(location: impl Into<PathBuf>) -> Self {
        Self {
            location: Some(location.into()),
            ..Self::default()
        }
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn set_location(&mut self, location: impl Into<PathBuf>) {
        self.location = Some(location.into());
    }

    /// Encoding used to decode list files. Defaults to UTF-8.
    pub fn list_encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn set_list_encoding(&mut self, encoding: &'static Encoding) {
        self.encoding = encoding;
    }

    /// Separator between an entry and its inline features in list files.
    pub fn separator(&self) -> Option<&str> {
        self.separator.as_deref()
    }

    pub fn set_separator(&mut self, separator: Option<String>) {
        self.separator = separator.filter(|s| !s.is_empty());
    }

    /// Read the definition file and load every list it names.
    ///
    /// Replaces the current contents. On any error the definition is left
    /// exactly as it was before the call.
    pub fn load(&mut self) -> Result<(), ListsError> {
        let location = self.require_location()?.to_path_buf();
        let text = resource::read_text(&location, encoding_rs::UTF_8)?;

        let mut staged = Self {
            location: Some(location.clone()),
            encoding: self.encoding,
            separator: self.separator.clone(),
            ..Self::default()
        };
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let descriptor: ListEntryDescriptor = line
                .parse()
                .map_err(|e| at_line(e, &location, idx + 1))?;
            if !staged.add(descriptor)? {
                tracing::warn!(
                    definition = %location.display(),
                    line = idx + 1,
                    "list named twice, later line ignored"
                );
            }
        }
        staged.modified = false;

        tracing::info!(
            definition = %location.display(),
            lists = staged.len(),
            "loaded gazetteer definition"
        );
        *self = staged;
        Ok(())
    }

    /// Write the descriptors back to the definition file, in order.
    pub fn store(&mut self) -> Result<(), ListsError> {
        let location = self.require_location()?;
        resource::write_atomic(location, &self.to_definition_string())?;
        tracing::debug!(definition = %location.display(), "stored gazetteer definition");
        self.modified = false;
        Ok(())
    }

    /// The definition file text: one serialized descriptor per line.
    pub fn to_definition_string(&self) -> String {
        self.descriptors
            .iter()
            .map(|d| format!("{d}\n"))
            .collect()
    }

    /// Add a descriptor and load its list.
    ///
    /// Returns `Ok(false)` without touching anything when the list name is
    /// already present. A list that cannot be loaded leaves the definition
    /// unchanged.
    pub fn add(&mut self, descriptor: ListEntryDescriptor) -> Result<bool, ListsError> {
        if self.lists.contains_key(descriptor.list()) {
            return Ok(false);
        }
        let list = self.load_list(descriptor.list())?;
        Ok(self.insert(descriptor, list))
    }

    /// Add a descriptor together with a list built in memory.
    ///
    /// Same uniqueness rule as [`Definition::add`], without any I/O.
    pub fn add_with_list(&mut self, descriptor: ListEntryDescriptor, list: DictionaryList) -> bool {
        if self.lists.contains_key(descriptor.list()) {
            return false;
        }
        self.insert(descriptor, Arc::new(list))
    }

    fn insert(&mut self, descriptor: ListEntryDescriptor, list: Arc<DictionaryList>) -> bool {
        self.lists.insert(descriptor.list().to_string(), list);
        self.descriptors.push(descriptor);
        self.modified = true;
        true
    }

    /// Remove a descriptor if an equal one is present.
    pub fn remove(&mut self, descriptor: &ListEntryDescriptor) -> bool {
        let Some(pos) = self.descriptors.iter().position(|d| d == descriptor) else {
            return false;
        };
        self.remove_at(pos);
        true
    }

    /// Remove the descriptor for `list_name`, returning it.
    pub fn remove_list(&mut self, list_name: &str) -> Option<ListEntryDescriptor> {
        let pos = self.descriptors.iter().position(|d| d.list() == list_name)?;
        Some(self.remove_at(pos))
    }

    fn remove_at(&mut self, pos: usize) -> ListEntryDescriptor {
        let removed = self.descriptors.remove(pos);
        self.lists.remove(removed.list());
        self.modified = true;
        removed
    }

    /// Keep only the descriptors for which `keep` returns true.
    ///
    /// This is the way to remove entries while walking the definition.
    pub fn retain(&mut self, mut keep: impl FnMut(&ListEntryDescriptor) -> bool) {
        let before = self.descriptors.len();
        let lists = &mut self.lists;
        self.descriptors.retain(|d| {
            let kept = keep(d);
            if !kept {
                lists.remove(d.list());
            }
            kept
        });
        if self.descriptors.len() != before {
            self.modified = true;
        }
    }

    pub fn clear(&mut self) {
        if !self.descriptors.is_empty() {
            self.modified = true;
        }
        self.descriptors.clear();
        self.lists.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ListEntryDescriptor> {
        self.descriptors.iter()
    }

    /// Descriptors paired with their loaded lists, in definition order.
    pub fn lists(&self) -> impl Iterator<Item = (&ListEntryDescriptor, &Arc<DictionaryList>)> {
        // Every descriptor has a list, see `insert`.
        self.descriptors
            .iter()
            .filter_map(|d| self.lists.get(d.list()).map(|list| (d, list)))
    }

    pub fn get(&self, list_name: &str) -> Option<&ListEntryDescriptor> {
        self.descriptors.iter().find(|d| d.list() == list_name)
    }

    /// The list loaded for `descriptor`, if that exact descriptor is present.
    pub fn list_for(&self, descriptor: &ListEntryDescriptor) -> Option<&Arc<DictionaryList>> {
        self.get(descriptor.list())
            .filter(|d| *d == descriptor)
            .and_then(|d| self.lists.get(d.list()))
    }

    pub fn list_names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(ListEntryDescriptor::list)
    }

    pub fn major_types(&self) -> BTreeSet<&str> {
        self.descriptors.iter().map(ListEntryDescriptor::major_type).collect()
    }

    /// Distinct minor types. Always contains the empty string.
    pub fn minor_types(&self) -> BTreeSet<&str> {
        let mut types: BTreeSet<&str> = self
            .descriptors
            .iter()
            .filter_map(ListEntryDescriptor::minor_type)
            .collect();
        types.insert("");
        types
    }

    /// Distinct languages. Always contains the empty string.
    pub fn languages(&self) -> BTreeSet<&str> {
        let mut languages: BTreeSet<&str> = self
            .descriptors
            .iter()
            .filter_map(ListEntryDescriptor::language)
            .collect();
        languages.insert("");
        languages
    }

    /// Total number of entries across all loaded lists.
    pub fn entry_count(&self) -> usize {
        self.lists().map(|(_, list)| list.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Whether the definition changed since it was last loaded or stored.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    fn require_location(&self) -> Result<&Path, ListsError> {
        self.location
            .as_deref()
            .ok_or_else(|| ListsError::resource("<unset>", "no definition location set"))
    }

    fn load_list(&self, list_name: &str) -> Result<Arc<DictionaryList>, ListsError> {
        let path = resource::resolve_relative(self.location.as_deref(), list_name)?;
        if let Some(existing) = self
            .lists
            .values()
            .find(|list| list.location() == Some(path.as_path()))
        {
            tracing::debug!(path = %path.display(), "reusing already loaded list");
            return Ok(Arc::clone(existing));
        }
        let list = DictionaryList::load(&path, self.encoding, self.separator.as_deref())?;
        Ok(Arc::new(list))
    }
}

impl<'a> IntoIterator for &'a Definition {
    type Item = &'a ListEntryDescriptor;
    type IntoIter = std::slice::Iter<'a, ListEntryDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter()
    }
}

fn at_line(err: ListsError, location: &Path, line_no: usize) -> ListsError {
    match err {
        ListsError::Format { line, reason } => ListsError::Format {
            line,
            reason: format!("{reason} ({}:{line_no})", location.display()),
        },
        other => other,
    }
}
