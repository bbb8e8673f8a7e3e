use crate::error::{Error, Result};
use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Vector clock: one counter per node id, a missing node reads as 0.
///
/// The partial order is the usual causal one. Note that [`concurrent`]
/// is defined as "neither precedes the other", so two equal clocks are
/// also concurrent.
///
/// [`concurrent`]: VectorClock::concurrent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorClock {
    counters: BTreeMap<NodeId, u64>,
}

impl VectorClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter for `node`, 0 if absent
    pub fn get(&self, node: &str) -> u64 {
        self.counters.get(node).copied().unwrap_or(0)
    }

    pub fn counters(&self) -> &BTreeMap<NodeId, u64> {
        &self.counters
    }

    /// True iff `self` happened strictly before `other`.
    pub fn precedes(&self, other: &VectorClock) -> bool {
        let mut less = false;
        for (node, &count) in &self.counters {
            let theirs = other.get(node);
            if count > theirs {
                return false;
            }
            if count < theirs {
                less = true;
            }
        }

        // Nodes only `other` has seen also make us smaller
        less || other
            .counters
            .iter()
            .any(|(node, &count)| count != 0 && !self.counters.contains_key(node))
    }

    /// Neither clock precedes the other. Holds for equal clocks too.
    pub fn concurrent(&self, other: &VectorClock) -> bool {
        !self.precedes(other) && !other.precedes(self)
    }

    /// Pointwise equality with missing entries read as 0.
    pub fn equals(&self, other: &VectorClock) -> bool {
        self.counters
            .keys()
            .chain(other.counters.keys())
            .all(|node| self.get(node) == other.get(node))
    }

    /// Bump `node`'s counter. Leaves the clock untouched and fails if the
    /// counter is already `u64::MAX`.
    pub fn increment(&mut self, node: &str) -> Result<()> {
        let next = self
            .get(node)
            .checked_add(1)
            .ok_or_else(|| Error::ClockOverflow {
                node_id: node.to_string(),
            })?;
        self.counters.insert(node.to_string(), next);
        Ok(())
    }

    /// Pointwise maximum of `self` and every clock in `clocks`, in place.
    ///
    /// The result causally dominates (or equals) every input. A client that
    /// has read several siblings merges their clocks so its next write
    /// supersedes all of them.
    pub fn merge<'a>(&mut self, clocks: impl IntoIterator<Item = &'a VectorClock>) {
        for clock in clocks {
            for (node, &theirs) in &clock.counters {
                match self.counters.get_mut(node) {
                    Some(ours) if *ours >= theirs => {}
                    Some(ours) => *ours = theirs,
                    None => {
                        self.counters.insert(node.clone(), theirs);
                    }
                }
            }
        }
    }
}

impl<K: Into<NodeId>> FromIterator<(K, u64)> for VectorClock {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        Self {
            counters: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
