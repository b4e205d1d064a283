use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An entity kept in a [`Ledger`]: identified locally by a stable slug and
/// remotely by the source system's numeric id.
pub trait LedgerEntry {
    fn local_id(&self) -> &str;
    fn remote_id(&self) -> u64;
    fn set_remote_id(&mut self, remote_id: u64);
}

/// What reconciling a remote record against the ledger did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The entry was new and has been appended.
    Created,
    /// The entry already existed; only its remote id was refreshed.
    Refreshed,
}

/// Ordered, de-duplicated collection of entries keyed by local id.
///
/// Insertion order is preserved so the persisted file diffs cleanly between
/// runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger<E> {
    entries: Vec<E>,
    index: HashMap<String, usize>,
}

impl<E> Default for Ledger<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<E: LedgerEntry> Ledger<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger from persisted entries. When the same local id occurs
    /// more than once, the first occurrence wins.
    pub fn from_entries(entries: impl IntoIterator<Item = E>) -> Self {
        let mut ledger = Self::new();
        for entry in entries {
            ledger.insert(entry);
        }
        ledger
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, local_id: &str) -> bool {
        self.index.contains_key(local_id)
    }

    pub fn get(&self, local_id: &str) -> Option<&E> {
        self.index.get(local_id).map(|&idx| &self.entries[idx])
    }

    pub fn get_mut(&mut self, local_id: &str) -> Option<&mut E> {
        match self.index.get(local_id) {
            Some(&idx) => Some(&mut self.entries[idx]),
            None => None,
        }
    }

    pub fn find_by_remote_id(&self, remote_id: u64) -> Option<&E> {
        self.entries.iter().find(|e| e.remote_id() == remote_id)
    }

    /// Entries whose remote id is listed in `remote_ids`, in ledger order.
    pub fn filter_by_remote_ids<'a>(&'a self, remote_ids: &'a [u64]) -> impl Iterator<Item = &'a E> {
        self.entries
            .iter()
            .filter(move |e| remote_ids.contains(&e.remote_id()))
    }

    /// Appends `entry` unless its local id is already taken. Returns whether
    /// the entry was inserted.
    pub fn insert(&mut self, entry: E) -> bool {
        if self.index.contains_key(entry.local_id()) {
            return false;
        }
        self.index
            .insert(entry.local_id().to_string(), self.entries.len());
        self.entries.push(entry);
        true
    }

    /// Refreshes the remote id of an existing entry, leaving everything else
    /// untouched. Returns `None` if no entry with `local_id` exists.
    pub fn refresh_remote_id(&mut self, local_id: &str, remote_id: u64) -> Option<MergeOutcome> {
        let entry = self.get_mut(local_id)?;
        entry.set_remote_id(remote_id);
        Some(MergeOutcome::Refreshed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[E] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<E> {
        self.entries
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub website: String,
    /// Avatar filename inside the authors directory, present only when the
    /// download succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(alias = "wordpressId")]
    pub remote_id: u64,
    /// Keys added locally that the archiver does not manage.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LedgerEntry for AuthorEntry {
    fn local_id(&self) -> &str {
        &self.id
    }

    fn remote_id(&self) -> u64 {
        self.remote_id
    }

    fn set_remote_id(&mut self, remote_id: u64) {
        self.remote_id = remote_id;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "wordpressId")]
    pub remote_id: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LedgerEntry for CategoryEntry {
    fn local_id(&self) -> &str {
        &self.id
    }

    fn remote_id(&self) -> u64 {
        self.remote_id
    }

    fn set_remote_id(&mut self, remote_id: u64) {
        self.remote_id = remote_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: &str, remote_id: u64) -> CategoryEntry {
        CategoryEntry {
            id: id.to_string(),
            name: id.to_uppercase(),
            description: String::new(),
            remote_id,
            extra: Map::new(),
        }
    }

    #[test]
    fn duplicate_ids_keep_first_entry() {
        let ledger = Ledger::from_entries(vec![category("news", 1), category("news", 2)]);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get("news").map(|c| c.remote_id), Some(1));
    }

    #[test]
    fn refresh_only_touches_remote_id() {
        let mut entry = category("news", 1);
        entry.description = "local notes".to_string();
        let mut ledger = Ledger::from_entries(vec![entry]);

        assert_eq!(
            ledger.refresh_remote_id("news", 9),
            Some(MergeOutcome::Refreshed)
        );
        let refreshed = ledger.get("news").unwrap();
        assert_eq!(refreshed.remote_id, 9);
        assert_eq!(refreshed.description, "local notes");
        assert_eq!(ledger.refresh_remote_id("missing", 3), None);
    }

    #[test]
    fn filter_by_remote_ids_keeps_ledger_order() {
        let ledger = Ledger::from_entries(vec![category("a", 1), category("b", 2), category("c", 3)]);
        let ids: Vec<&str> = ledger
            .filter_by_remote_ids(&[3, 1])
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
