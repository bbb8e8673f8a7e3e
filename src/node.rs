use crate::availability::AvailabilitySwitch;
use crate::config::NodeConfig;
use crate::error::{Error, Result};
use crate::store::VersionStore;
use crate::types::{Entry, NodeId, NodeInfo, PutArgs};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatus {
    pub id: NodeId,
    pub endpoint: String,
    pub available: bool,
    pub unavailable_for_ms: u64,
    pub n_keys: usize,
    pub n_entries: usize,
    pub write_quorum: usize,
    pub read_quorum: usize,
    pub peers: Vec<NodeInfo>,
}

/// Mutable state of one replica - all protected by a single RwLock
pub struct NodeState {
    pub id: NodeId,

    config: NodeConfig,

    /// Ordered preference list, may include this node
    peers: Vec<NodeInfo>,

    store: VersionStore,

    availability: AvailabilitySwitch,
}

/// One replica of the store.
///
/// - Pure in-memory multi-version KV, no persistence
/// - Vector clock reconciliation, concurrent writes kept as siblings
/// - Single RwLock around all state; the write guard covers a whole
///   reconcile scan
///
/// Local operations (`PutLocal`, `GetLocal`, `Crash`, `SetPeerList`) live
/// on [`NodeState`]. Quorum operations that talk to peers live on
/// [`crate::replication::Coordinator`].
pub struct Node {
    state: Arc<RwLock<NodeState>>,
}

impl NodeState {
    fn ensure_available(&self) -> Result<()> {
        match self.availability.remaining() {
            None => Ok(()),
            Some(remaining) => Err(Error::Unavailable {
                node_id: self.id.clone(),
                remaining,
            }),
        }
    }

    /// Reconcile a version into the local store
    pub fn put_local(&mut self, args: PutArgs) -> Result<bool> {
        self.ensure_available()?;
        let (key, entry) = args.into_entry();
        let accepted = self.store.apply(&key, entry);
        debug!(key, accepted, "put_local");
        Ok(accepted)
    }

    /// All versions currently held for `key`
    pub fn get_local(&self, key: &str) -> Result<Vec<Entry>> {
        self.ensure_available()?;
        Ok(self.store.get(key))
    }

    /// Stamp `args` with this node's clock coordinate and store it locally.
    ///
    /// This is the local half of a coordinated `Put`: the incremented
    /// context is left in `args` so the same version can be replicated.
    pub fn stamp_and_put(&mut self, args: &mut PutArgs) -> Result<bool> {
        args.context.clock.increment(&self.id)?;
        self.put_local(args.clone())
    }

    /// Make this node unavailable for `duration`
    pub fn crash(&mut self, duration: Duration) {
        self.availability.crash(duration);
        info!("Node {} unavailable for {:?}", self.id, duration);
    }

    pub fn recover(&mut self) {
        self.availability.recover();
        info!("Node {} available again", self.id);
    }

    pub fn is_available(&self) -> bool {
        self.availability.is_available()
    }

    /// Replace the preference list
    pub fn set_peer_list(&mut self, peers: Vec<NodeInfo>) {
        info!("Node {} received preference list of {} nodes", self.id, peers.len());
        self.peers = peers;
    }

    /// Preference list in order, without the entry matching this node
    pub fn remote_peers(&self) -> Vec<NodeInfo> {
        let me = self.self_node();
        self.peers
            .iter()
            .filter(|peer| !peer.same_endpoint(&me))
            .cloned()
            .collect()
    }

    pub fn self_node(&self) -> NodeInfo {
        self.config.self_node()
    }

    pub fn write_quorum(&self) -> usize {
        self.config.write_quorum
    }

    pub fn read_quorum(&self) -> usize {
        self.config.read_quorum
    }

    /// Copy of every stored `(key, entry)` pair (for gossip)
    pub fn snapshot(&self) -> Vec<(String, Entry)> {
        self.store
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    /// Get node status (for debugging/monitoring)
    pub fn status(&self) -> NodeStatus {
        let remaining = self.availability.remaining();
        NodeStatus {
            id: self.id.clone(),
            endpoint: self.self_node().endpoint(),
            available: remaining.is_none(),
            unavailable_for_ms: remaining
                .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            n_keys: self.store.len(),
            n_entries: self.store.entry_count(),
            write_quorum: self.config.write_quorum,
            read_quorum: self.config.read_quorum,
            peers: self.peers.clone(),
        }
    }
}

impl Node {
    pub fn new(config: NodeConfig, peers: Vec<NodeInfo>) -> Result<Self> {
        config.validate()?;

        let state = NodeState {
            id: config.node_id.clone(),
            config,
            peers,
            store: VersionStore::new(),
            availability: AvailabilitySwitch::new(),
        };

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
        })
    }

    pub fn write(&self) -> RwLockWriteGuard<NodeState> {
        self.state.write().expect("Failed to lock node state")
    }

    pub fn read(&self) -> RwLockReadGuard<NodeState> {
        self.state.read().expect("Failed to lock node state")
    }

    pub fn put_local(&self, args: PutArgs) -> Result<bool> {
        self.write().put_local(args)
    }

    pub fn get_local(&self, key: &str) -> Result<Vec<Entry>> {
        self.read().get_local(key)
    }

    pub fn crash(&self, duration: Duration) {
        self.write().crash(duration)
    }

    pub fn set_peer_list(&self, peers: Vec<NodeInfo>) {
        self.write().set_peer_list(peers)
    }

    pub fn status(&self) -> NodeStatus {
        self.read().status()
    }
}
