//! The in-memory archive index.
//!
//! An [`IndexStore`] owns a flat list of [`IndexEntry`] values and a category
//! tree that groups them. Categories live in an arena addressed by
//! [`CategoryId`]; the root has id [`ROOT`] and no name. The store performs no
//! I/O: scanning fills it and [`cache`] persists it.
//!
//! # Example
//!
//! ```rust
//! use datscope::format::{DecoderKind, FileType};
//! use datscope::index::{IndexStore, ROOT};
//!
//! let mut store = IndexStore::new();
//! let models = store.find_or_add_subcategory(ROOT, "Models");
//! store.insert(7, FileType::Model, DecoderKind::Model, models, "7");
//!
//! assert_eq!(store.find_category(&["Models"]), Some(models));
//! assert_eq!(store.entry_by_id(7).unwrap().name, "7");
//! assert!(store.is_dirty());
//! ```

pub mod cache;
pub mod categorize;

use std::collections::HashMap;

use crate::format::{DecoderKind, FileType};

pub use categorize::categorize;

/// Index of a category in the store's arena.
pub type CategoryId = usize;

/// Id of the unnamed root category.
pub const ROOT: CategoryId = 0;

/// A node of the category tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    name: String,
    parent: Option<CategoryId>,
    children: Vec<CategoryId>,
    entries: Vec<usize>,
}

impl Category {
    fn new(name: String, parent: Option<CategoryId>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Returns the category name; empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent category, `None` for the root.
    pub fn parent(&self) -> Option<CategoryId> {
        self.parent
    }

    /// Returns the child categories in insertion order.
    pub fn children(&self) -> &[CategoryId] {
        &self.children
    }

    /// Returns the number of entries directly in this category.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

/// One indexed archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Archive entry id.
    pub entry_id: u32,
    /// Declared type identified from the leading bytes.
    pub file_type: FileType,
    /// Decoder the entry resolved to when it was scanned.
    pub kind: DecoderKind,
    /// Category holding the entry.
    pub category: CategoryId,
    /// Display name.
    pub name: String,
}

/// The archive index: entries, category tree and bookkeeping.
#[derive(Debug, Clone)]
pub struct IndexStore {
    entries: Vec<IndexEntry>,
    categories: Vec<Category>,
    by_id: HashMap<u32, usize>,
    source_timestamp: u64,
    highest_seen: u32,
    dirty: bool,
}

impl Default for IndexStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexStore {
    /// Creates an empty, clean store.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            categories: vec![Category::new(String::new(), None)],
            by_id: HashMap::new(),
            source_timestamp: 0,
            highest_seen: 0,
            dirty: false,
        }
    }

    /// Returns the number of indexed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns all entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Returns the archive modification time the index was built against.
    ///
    /// Zero means the index is empty or was invalidated.
    pub fn source_timestamp(&self) -> u64 {
        self.source_timestamp
    }

    /// Sets the archive modification time and marks the store dirty.
    pub fn set_source_timestamp(&mut self, timestamp: u64) {
        if self.source_timestamp != timestamp {
            self.source_timestamp = timestamp;
            self.dirty = true;
        }
    }

    /// Returns one past the highest entry id the scanner has visited.
    pub fn highest_seen(&self) -> u32 {
        self.highest_seen
    }

    /// Records that every id below `entry_id` has been visited.
    ///
    /// Never moves backwards; only [`clear`](Self::clear) resets it.
    pub fn advance_highest_seen(&mut self, entry_id: u32) {
        if entry_id > self.highest_seen {
            self.highest_seen = entry_id;
            self.dirty = true;
        }
    }

    /// Returns `true` if the store changed since it was last persisted.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Marks the store as persisted.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Marks the store as needing persistence.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Removes all entries and categories and resets the timestamp and
    /// highest seen id. The store is left dirty.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.categories.truncate(1);
        self.categories[ROOT].children.clear();
        self.categories[ROOT].entries.clear();
        self.by_id.clear();
        self.source_timestamp = 0;
        self.highest_seen = 0;
        self.dirty = true;
    }

    /// Returns a category by id.
    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.get(id)
    }

    /// Returns the number of categories, including the root.
    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// Returns the child of `parent` named `name`, creating it if needed.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is not a category of this store.
    pub fn find_or_add_subcategory(&mut self, parent: CategoryId, name: &str) -> CategoryId {
        if let Some(existing) = self.child_named(parent, name) {
            return existing;
        }
        let id = self.categories.len();
        self.categories.push(Category::new(name.to_string(), Some(parent)));
        self.categories[parent].children.push(id);
        id
    }

    /// Creates every missing category along `path` below the root.
    pub fn add_category_path<S: AsRef<str>>(&mut self, path: &[S]) -> CategoryId {
        path.iter().fold(ROOT, |parent, name| {
            self.find_or_add_subcategory(parent, name.as_ref())
        })
    }

    /// Looks up a category by its path of names below the root.
    pub fn find_category<S: AsRef<str>>(&self, path: &[S]) -> Option<CategoryId> {
        path.iter()
            .try_fold(ROOT, |parent, name| self.child_named(parent, name.as_ref()))
    }

    /// Returns the names from the root down to `id`, excluding the root.
    pub fn category_path(&self, id: CategoryId) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(cat) = current.and_then(|c| self.categories.get(c)) {
            if cat.parent.is_none() {
                break;
            }
            path.push(cat.name.as_str());
            current = cat.parent;
        }
        path.reverse();
        path
    }

    /// Adds an entry to `category`.
    ///
    /// Returns `false` without changing anything if the entry id is already
    /// indexed or the category does not exist.
    pub fn insert(
        &mut self,
        entry_id: u32,
        file_type: FileType,
        kind: DecoderKind,
        category: CategoryId,
        name: impl Into<String>,
    ) -> bool {
        if self.by_id.contains_key(&entry_id) || category >= self.categories.len() {
            return false;
        }
        let index = self.entries.len();
        self.entries.push(IndexEntry {
            entry_id,
            file_type,
            kind,
            category,
            name: name.into(),
        });
        self.categories[category].entries.push(index);
        self.by_id.insert(entry_id, index);
        self.dirty = true;
        true
    }

    /// Returns the entry with the given archive id.
    pub fn entry_by_id(&self, entry_id: u32) -> Option<&IndexEntry> {
        self.by_id.get(&entry_id).map(|&i| &self.entries[i])
    }

    /// Returns the entries directly in `category`.
    pub fn entries_in(&self, category: CategoryId) -> impl Iterator<Item = &IndexEntry> {
        self.categories
            .get(category)
            .map(|c| c.entries.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&i| &self.entries[i])
    }

    /// Returns the entries in `category` and all of its descendants, depth first.
    pub fn entries_under(&self, category: CategoryId) -> Vec<&IndexEntry> {
        let mut out = Vec::new();
        let mut stack = vec![category];
        while let Some(id) = stack.pop() {
            let Some(cat) = self.categories.get(id) else {
                continue;
            };
            out.extend(cat.entries.iter().map(|&i| &self.entries[i]));
            stack.extend(cat.children.iter().rev());
        }
        out
    }

    /// Returns `true` if both stores hold the same entries, tree, timestamp
    /// and highest seen id. The dirty flag is not compared.
    pub fn same_contents(&self, other: &IndexStore) -> bool {
        self.entries == other.entries
            && self.categories == other.categories
            && self.source_timestamp == other.source_timestamp
            && self.highest_seen == other.highest_seen
    }

    fn child_named(&self, parent: CategoryId, name: &str) -> Option<CategoryId> {
        self.categories
            .get(parent)?
            .children
            .iter()
            .copied()
            .find(|&c| self.categories[c].name == name)
    }

    /// Appends a category during deserialization, rejecting dangling parents
    /// and duplicate sibling names.
    pub(crate) fn push_category(
        &mut self,
        parent: CategoryId,
        name: String,
    ) -> std::result::Result<CategoryId, String> {
        if parent >= self.categories.len() {
            return Err(format!("category parent {} does not exist", parent));
        }
        if self.child_named(parent, &name).is_some() {
            return Err(format!("duplicate category name '{}'", name));
        }
        let id = self.categories.len();
        self.categories.push(Category::new(name, Some(parent)));
        self.categories[parent].children.push(id);
        Ok(id)
    }

    /// Restores bookkeeping fields during deserialization.
    pub(crate) fn restore_state(&mut self, source_timestamp: u64, highest_seen: u32) {
        self.source_timestamp = source_timestamp;
        self.highest_seen = highest_seen;
    }

    /// Iterates categories in creation order, skipping the root.
    pub(crate) fn categories_after_root(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter().skip(1)
    }
}
