use crate::types::Entry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

/// The causally maximal versions of one key.
///
/// Entries are kept in insertion order, which is also the scan order of
/// [`Siblings::reconcile`]. Outside of a reconcile call no entry precedes
/// another.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Siblings {
    entries: Vec<Entry>,
}

impl Siblings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer `incoming` to the set. Returns whether it was stored.
    ///
    /// Existing entries dominated by `incoming` are evicted. `incoming` is
    /// kept if it evicted something or is concurrent with (or equal to)
    /// everything present, and rejected as soon as an existing entry
    /// dominates it.
    ///
    /// A rejection stops the scan where it is: entries evicted earlier in
    /// the same scan stay evicted. Callers observe a rejected write that
    /// still pruned superseded siblings, and this is relied upon by tests.
    pub fn reconcile(&mut self, incoming: Entry) -> bool {
        let mut bigger = false;
        let mut incomparable = true;

        let mut idx = 0;
        while idx < self.entries.len() {
            let existing = self.entries[idx].clock();
            let superseded = existing.precedes(incoming.clock());
            let related =
                !existing.concurrent(incoming.clock()) || existing.equals(incoming.clock());
            let dominated = incoming.clock().precedes(existing);

            if related {
                incomparable = false;
            }
            if dominated {
                trace!(?incoming, position = idx, "rejected: dominated by existing entry");
                return false;
            }
            if superseded {
                let evicted = self.entries.remove(idx);
                trace!(?evicted, "evicted superseded entry");
                bigger = true;
            } else {
                idx += 1;
            }
        }

        if bigger || incomparable {
            self.entries.push(incoming);
            return true;
        }
        trace!(?incoming, "rejected: equal to an existing entry");
        false
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<Entry>> for Siblings {
    /// Wrap entries as-is, without reconciling them against each other.
    fn from(entries: Vec<Entry>) -> Self {
        Self { entries }
    }
}

/// Per-key multi-version store.
///
/// BTreeMap keeps key iteration (and therefore gossip order) stable.
#[derive(Debug, Clone, Default)]
pub struct VersionStore {
    data: BTreeMap<String, Siblings>,
}

impl VersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile `entry` into the versions of `key`
    pub fn apply(&mut self, key: &str, entry: Entry) -> bool {
        let siblings = self.data.entry(key.to_string()).or_default();
        let accepted = siblings.reconcile(entry);
        if siblings.is_empty() {
            self.data.remove(key);
        }
        accepted
    }

    /// Current versions of `key`, empty if unknown
    pub fn get(&self, key: &str) -> Vec<Entry> {
        self.data
            .get(key)
            .map(|siblings| siblings.entries().to_vec())
            .unwrap_or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    /// Every stored `(key, entry)` pair, key order then sibling order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.data
            .iter()
            .flat_map(|(key, siblings)| siblings.entries().iter().map(move |entry| (key, entry)))
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of stored versions across all keys
    pub fn entry_count(&self) -> usize {
        self.data.values().map(Siblings::len).sum()
    }
}
