use crate::clock::VectorClock;
use serde::{Deserialize, Serialize};

/// Coordinate key of a node inside vector clocks
pub type NodeId = String;

/// Network identity of a cluster member.
///
/// `node_id` is only used as a vector clock coordinate; routing and the
/// "is this me" check go by `address` and `port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeInfo {
    pub address: String,
    pub port: u16,
    pub node_id: NodeId,
}

impl NodeInfo {
    pub fn new(address: impl Into<String>, port: u16, node_id: impl Into<NodeId>) -> Self {
        Self {
            address: address.into(),
            port,
            node_id: node_id.into(),
        }
    }

    pub fn same_endpoint(&self, other: &NodeInfo) -> bool {
        self.address == other.address && self.port == other.port
    }

    /// `host:port`, as used by transports
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Causal metadata attached to a stored value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionContext {
    pub clock: VectorClock,
}

impl VersionContext {
    pub fn new(clock: VectorClock) -> Self {
        Self { clock }
    }

    /// Context for a first write: an all-zero clock
    pub fn fresh() -> Self {
        Self::default()
    }

    /// Context that supersedes every sibling in `entries`.
    ///
    /// This is what a client does after a read returned more than one
    /// version and it wants its next write to replace all of them.
    pub fn merged(entries: &[Entry]) -> Self {
        let mut clock = VectorClock::new();
        clock.merge(entries.iter().map(|entry| &entry.context.clock));
        Self { clock }
    }
}

/// One causally distinct version of a key
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub context: VersionContext,
    pub value: Vec<u8>,
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("clock", self.context.clock.counters())
            .field("value_len", &self.value.len())
            .finish()
    }
}

impl Entry {
    pub fn new(context: VersionContext, value: impl Into<Vec<u8>>) -> Self {
        Self {
            context,
            value: value.into(),
        }
    }

    pub fn clock(&self) -> &VectorClock {
        &self.context.clock
    }
}

/// Arguments of `Put` and `PutLocal`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PutArgs {
    pub key: String,
    pub context: VersionContext,
    pub value: Vec<u8>,
}

impl PutArgs {
    pub fn new(key: impl Into<String>, context: VersionContext, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            context,
            value: value.into(),
        }
    }

    /// Put with a fresh (all-zero) context
    pub fn fresh(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::new(key, VersionContext::fresh(), value)
    }

    pub fn into_entry(self) -> (String, Entry) {
        (self.key, Entry::new(self.context, self.value))
    }
}
