//! Directory index
//!
//! The catalog maps file identity to the ordered list of block runs that
//! hold the file's bytes. Keys iterate in case-insensitive lexicographic
//! order; runs under a key stay in the order they were inserted, which is
//! the order of the bytes in the file.

pub mod metadata;

pub use metadata::{fold_name, FileKey};

use crate::allocator::Extent;
use crate::error::{ImffsError, Result};
use std::collections::BTreeMap;

/// One key and its runs
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub key: FileKey,
    pub runs: Vec<Extent>,
}

impl CatalogEntry {
    pub fn new(key: FileKey) -> Self {
        CatalogEntry {
            key,
            runs: Vec::new(),
        }
    }

    /// Total number of blocks across all runs
    pub fn block_count(&self) -> u64 {
        self.runs.iter().map(|r| r.length).sum()
    }

    /// Total capacity of all runs in bytes
    pub fn capacity(&self) -> u64 {
        self.runs.iter().map(|r| r.byte_len()).sum()
    }
}

/// Catalog for file identities and their runs
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    /// Entries indexed by folded name
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a complete entry; fails if the name is taken
    pub fn insert(&mut self, entry: CatalogEntry) -> Result<()> {
        let folded = entry.key.folded_name();
        if self.entries.contains_key(&folded) {
            return Err(ImffsError::AlreadyExists(entry.key.name));
        }
        self.entries.insert(folded, entry);
        Ok(())
    }

    /// Append a run under `key`, creating the key if absent
    pub fn insert_value(&mut self, key: &FileKey, run: Extent) {
        self.entries
            .entry(key.folded_name())
            .or_insert_with(|| CatalogEntry::new(key.clone()))
            .runs
            .push(run);
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(&fold_name(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&fold_name(name))
    }

    /// All keys in index order
    pub fn keys(&self) -> impl Iterator<Item = &FileKey> {
        self.entries.values().map(|e| &e.key)
    }

    /// All entries in index order
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    /// Folded names in index order, detached from the catalog
    pub fn folded_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn count_values(&self, name: &str) -> Option<usize> {
        self.get(name).map(|e| e.runs.len())
    }

    pub fn get_values(&self, name: &str) -> Option<&[Extent]> {
        self.get(name).map(|e| e.runs.as_slice())
    }

    /// Remove a key and all its runs
    pub fn remove_key(&mut self, name: &str) -> Option<CatalogEntry> {
        self.entries.remove(&fold_name(name))
    }

    /// Change a key's name, keeping its size and runs
    ///
    /// Renaming to a case variant of the same name is allowed; renaming
    /// onto a different existing key is not.
    pub fn rename_key(&mut self, old: &str, new: &str) -> Result<()> {
        let old_folded = fold_name(old);
        let new_folded = fold_name(new);

        if new_folded != old_folded && self.entries.contains_key(&new_folded) {
            return Err(ImffsError::AlreadyExists(new.to_string()));
        }

        let mut entry = self
            .entries
            .remove(&old_folded)
            .ok_or_else(|| ImffsError::NotFound(old.to_string()))?;

        entry.key.name = new.to_string();
        self.entries.insert(new_folded, entry);
        Ok(())
    }

    /// Swap a key's runs for a new list (used when runs are relocated)
    pub fn replace_values(&mut self, name: &str, runs: Vec<Extent>) -> Result<()> {
        let entry = self
            .entries
            .get_mut(&fold_name(name))
            .ok_or_else(|| ImffsError::NotFound(name.to_string()))?;
        entry.runs = runs;
        Ok(())
    }
}
