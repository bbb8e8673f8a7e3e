use crate::types::NodeId;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The node is inside a crash window and refuses local reads and writes.
    #[error("node {node_id:?} is unavailable for another {remaining:?}")]
    Unavailable { node_id: NodeId, remaining: Duration },

    /// Transport could not reach a peer during fan-out or gossip.
    #[error("peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: String, reason: String },

    /// The write context already holds the largest counter for this node,
    /// so no version can be stamped after it.
    #[error("vector clock counter for {node_id:?} is exhausted")]
    ClockOverflow { node_id: NodeId },

    #[error("invalid node configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::Unavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
