use crate::error::Result;
use crate::node::Node;
use crate::replication::PeerInterface;
use crate::types::{Entry, NodeInfo, PutArgs};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Outcome of one gossip round
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GossipReport {
    pub peers_contacted: usize,
    pub peers_failed: usize,
    pub entries_pushed: usize,
    pub entries_accepted: usize,
}

/// Anti-entropy: pushes the full local store to every peer.
///
/// Convergence does not depend on W or R. Receivers reconcile each pushed
/// version, so entries they already hold (or have superseded) are simply
/// rejected.
pub struct GossipEngine<Net: PeerInterface> {
    node: Arc<Node>,
    network: Arc<Net>,
}

impl<Net: PeerInterface> GossipEngine<Net> {
    pub fn new(node: Arc<Node>, network: Arc<Net>) -> Self {
        Self { node, network }
    }

    /// Push every stored version to every peer, once.
    ///
    /// A peer that fails mid-push is dropped for the rest of the round.
    #[tracing::instrument(skip(self))]
    pub async fn gossip(&self) -> GossipReport {
        // Snapshot under the lock, push without it
        let (peers, snapshot) = {
            let state = self.node.read();
            (state.remote_peers(), state.snapshot())
        };

        let mut report = GossipReport::default();
        for peer in &peers {
            let mut pushed = 0;
            match push_to(self.network.as_ref(), peer, &snapshot, &mut pushed).await {
                Ok(accepted) => {
                    report.peers_contacted += 1;
                    report.entries_accepted += accepted;
                    debug!(
                        "Pushed {pushed} versions to {}, {accepted} accepted",
                        peer.endpoint()
                    );
                }
                Err(e) => {
                    report.peers_failed += 1;
                    warn!(
                        "Gossip to {} aborted after {pushed} versions: {e}",
                        peer.endpoint()
                    );
                }
            }
            report.entries_pushed += pushed;
        }

        info!(
            "Gossip round: {} versions to {}/{} peers, {} accepted",
            snapshot.len(),
            report.peers_contacted,
            peers.len(),
            report.entries_accepted
        );
        report
    }

    /// Start periodic gossip rounds on the current tokio runtime
    pub fn start_gossip_tasks(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.periodic_gossip(period).await;
        })
    }

    async fn periodic_gossip(&self, period: Duration) {
        let mut ticker = interval(period);

        loop {
            ticker.tick().await;
            let report = self.gossip().await;
            if report.peers_failed > 0 {
                debug!("{} peers missed this gossip round", report.peers_failed);
            }
        }
    }
}

/// Push `snapshot` to one peer, returning how many versions it accepted.
async fn push_to<Net: PeerInterface>(
    network: &Net,
    peer: &NodeInfo,
    snapshot: &[(String, Entry)],
    pushed: &mut usize,
) -> Result<usize> {
    let mut accepted = 0;
    for (key, entry) in snapshot {
        let args = PutArgs::new(key.clone(), entry.context.clone(), entry.value.clone());
        if network.put_local(peer, args).await? {
            accepted += 1;
        }
        *pushed += 1;
    }
    Ok(accepted)
}
