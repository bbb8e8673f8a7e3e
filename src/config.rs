use crate::error::{Error, Result};
use crate::types::{NodeId, NodeInfo};
use serde::{Deserialize, Serialize};

/// Static configuration of one replica, supplied by whatever bootstraps
/// the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Coordinate used in vector clocks for writes this node coordinates
    pub node_id: NodeId,
    pub address: String,
    pub port: u16,
    /// W: replicas, this one included, that must accept a `Put`
    pub write_quorum: usize,
    /// R: replicas, this one included, consulted by a `Get`
    pub read_quorum: usize,
}

impl NodeConfig {
    pub fn new(
        node_id: impl Into<NodeId>,
        address: impl Into<String>,
        port: u16,
        write_quorum: usize,
        read_quorum: usize,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            address: address.into(),
            port,
            write_quorum,
            read_quorum,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_id.is_empty() {
            return Err(Error::InvalidConfig("node id must not be empty".into()));
        }
        if self.write_quorum == 0 {
            return Err(Error::InvalidConfig("write quorum (W) must be at least 1".into()));
        }
        if self.read_quorum == 0 {
            return Err(Error::InvalidConfig("read quorum (R) must be at least 1".into()));
        }
        Ok(())
    }

    pub fn self_node(&self) -> NodeInfo {
        NodeInfo::new(self.address.clone(), self.port, self.node_id.clone())
    }
}
