//! dynakv - An embeddable, Dynamo-style replicated key-value store core
//!
//! dynakv keeps every key as a set of causally maximal versions tagged with
//! vector clocks, replicates writes and reads under configurable W/R quorums
//! and converges replicas through anti-entropy gossip.
//!
//! # Key Features
//!
//! - **Vector clocks**: causality is tracked per write, not by wall time
//! - **Siblings instead of last-write-wins**: concurrent writes are all kept
//!   until a client writes a version that supersedes them
//! - **Quorum reads and writes**: W and R are set per node
//! - **Gossip**: full-state push keeps replicas converging independently of quorums
//! - **Crash simulation**: a node can make itself unavailable for a while
//! - **Transport-agnostic**: you provide the network layer through [`PeerInterface`]
//! - **In-memory**: nothing is persisted
//!
//! # Quick Start
//!
//! ```rust
//! use dynakv::{Node, NodeConfig, PutArgs};
//!
//! // Node "n0" with W = R = 1 and no peers
//! let node = Node::new(NodeConfig::new("n0", "127.0.0.1", 8080, 1, 1), vec![]).unwrap();
//!
//! assert!(node.put_local(PutArgs::fresh("key", b"value".to_vec())).unwrap());
//! let versions = node.get_local("key").unwrap();
//! assert_eq!(versions.len(), 1);
//! assert_eq!(versions[0].value, b"value");
//! ```
//!
//! # Architecture
//!
//! - [`Node`] - Thread-safe wrapper around one replica's state; local operations
//! - [`replication::Coordinator`] - Quorum `Put`/`Get` fanning out to peers
//! - [`gossip::GossipEngine`] - One-shot and periodic anti-entropy
//! - [`store::VersionStore`] - Per-key sibling sets and the reconciliation rule
//! - [`clock::VectorClock`] - The causal order everything above relies on
//!
//! # Non-goals
//!
//! - Durability across restarts
//! - Deletes / tombstones
//! - Cluster membership discovery (the preference list is handed in)
//! - A network transport in the library itself

pub mod availability;
pub mod clock;
pub mod config;
pub mod error;
pub mod gossip;
pub mod node;
pub mod replication;
pub mod store;
pub mod types;

pub use clock::VectorClock;
pub use config::NodeConfig;
pub use error::{Error, Result};
pub use node::Node;
pub use replication::{Coordinator, PeerInterface};
pub use types::{Entry, NodeId, NodeInfo, PutArgs, VersionContext};
