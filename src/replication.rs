use crate::error::Result;
use crate::node::Node;
use crate::store::Siblings;
use crate::types::{Entry, NodeInfo, PutArgs};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Remote calls a replica makes to its peers.
///
/// Implementations report a connection failure as
/// [`crate::Error::PeerUnreachable`] and a peer inside its crash window as
/// [`crate::Error::Unavailable`]. The coordinator treats both the same way.
pub trait PeerInterface: Send + Sync + 'static {
    fn put_local(
        &self,
        peer: &NodeInfo,
        args: PutArgs,
    ) -> impl Future<Output = Result<bool>> + Send;

    fn get_local(
        &self,
        peer: &NodeInfo,
        key: &str,
    ) -> impl Future<Output = Result<Vec<Entry>>> + Send;
}

/// Quorum `Put`/`Get` for requests landing on `node`
pub struct Coordinator<Net: PeerInterface> {
    node: Arc<Node>,
    network: Arc<Net>,
}

impl<Net: PeerInterface> Coordinator<Net> {
    pub fn new(node: Arc<Node>, network: Arc<Net>) -> Self {
        Self { node, network }
    }

    /// Write `args` here and on up to `W-1` peers.
    ///
    /// Protocol:
    /// - Increment the context clock at this node's id and reconcile locally.
    ///   A local rejection does not stop replication; local unavailability does.
    /// - Offer the stamped version to peers in preference-list order, skipping
    ///   self. Unreachable peers and peers that reject are not counted.
    /// - Stop once `W-1` peers accepted. Returns whether that count was reached.
    #[tracing::instrument(skip(self, args), fields(key = %args.key))]
    pub async fn put(&self, mut args: PutArgs) -> Result<bool> {
        let (accepted_locally, peers, write_quorum) = {
            let mut state = self.node.write();
            let accepted = state.stamp_and_put(&mut args)?;
            (accepted, state.remote_peers(), state.write_quorum())
        };
        debug!(
            accepted_locally,
            clock = ?args.context.clock,
            "Stored locally, replicating"
        );

        let target = write_quorum.saturating_sub(1);
        let mut acks = 0;
        for peer in &peers {
            if acks == target {
                break;
            }
            match self.network.put_local(peer, args.clone()).await {
                Ok(true) => {
                    acks += 1;
                    debug!("Peer {} accepted write ({acks}/{target})", peer.endpoint());
                }
                Ok(false) => debug!("Peer {} rejected write", peer.endpoint()),
                Err(e) => warn!("Skipping peer {} for write: {e}", peer.endpoint()),
            }
        }

        let reached = acks == target;
        if reached {
            debug!("Write quorum W={write_quorum} reached");
        } else {
            info!("Write quorum W={write_quorum} not reached: {acks}/{target} peer acks");
        }
        Ok(reached)
    }

    /// Read `key` here and from up to `R-1` peers, merging every version
    /// through the same reconciliation a local write goes through.
    ///
    /// A peer counts toward `R` once it answers, whether or not its versions
    /// change the result. Unreachable peers are skipped; the merged view is
    /// returned even if fewer than `R-1` peers answered.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Result<Vec<Entry>> {
        let (local, peers, read_quorum) = {
            let state = self.node.read();
            (state.get_local(key)?, state.remote_peers(), state.read_quorum())
        };
        let mut merged = Siblings::from(local);

        let target = read_quorum.saturating_sub(1);
        let mut contacted = 0;
        for peer in &peers {
            if contacted == target {
                break;
            }
            match self.network.get_local(peer, key).await {
                Ok(entries) => {
                    contacted += 1;
                    debug!("Peer {} returned {} versions", peer.endpoint(), entries.len());
                    for entry in entries {
                        merged.reconcile(entry);
                    }
                }
                Err(e) => warn!("Skipping peer {} for read: {e}", peer.endpoint()),
            }
        }

        if contacted < target {
            info!("Read quorum R={read_quorum} not reached: {contacted}/{target} peers answered");
        }
        Ok(merged.into_entries())
    }
}
