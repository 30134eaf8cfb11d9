//! Cluster membership, a single replicated log of shard placement
//! changes, and the consistent-hash ring derived from it (§4.4).

pub mod error;
pub mod network;
pub mod ring;
pub mod state_machine;
pub mod storage;
pub mod types;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use openraft::Raft;
use parking_lot::RwLock;
use tracing::info;

pub use error::{Error, Result};
use ring::Ring;
use state_machine::{Command, ClusterStateMachine};
use storage::{LogStore, StateMachineStore};
use types::{ClusterNode, NodeId, TypeConfig};

/// Default Raft tick/heartbeat cadence; overridable via config for tests.
const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 250;

/// The coordinator: wraps an `openraft::Raft` handle, the TCP RPC server,
/// and a consistent-hash ring rebuilt from the applied state machine.
pub struct ClusterCoordinator {
    pub node_id: NodeId,
    raft: Raft<TypeConfig>,
    state_machine: Arc<StateMachineStore>,
    ring: RwLock<Ring>,
    data_dir: PathBuf,
}

impl ClusterCoordinator {
    /// Starts the coordinator: ensures `data_dir` exists, opens (or
    /// creates) the snapshot-backed state machine, and constructs the
    /// `openraft::Raft` instance wired to the in-memory log store and TCP
    /// network factory (§4.4 "Lifecycle").
    pub async fn start(node_id: NodeId, rpc_addr: String, data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;

        let config = Arc::new(
            openraft::Config {
                heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL_MS,
                election_timeout_min: DEFAULT_HEARTBEAT_INTERVAL_MS * 4,
                election_timeout_max: DEFAULT_HEARTBEAT_INTERVAL_MS * 8,
                ..Default::default()
            }
            .validate()
            .map_err(|e| Error::Unavailable(e.to_string()))?,
        );

        let log_store = LogStore::open(&data_dir).map_err(|e| Error::Unavailable(e.to_string()))?;
        let state_machine = Arc::new(StateMachineStore::new(&data_dir));
        let network = network::TcpNetworkFactory;

        let raft = Raft::new(node_id, config, network, log_store, state_machine.clone())
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;

        let _ = rpc_addr; // recorded by the caller's membership entry, not needed locally

        let ring = Ring::build(&state_machine.state_machine.read().placement_entries());

        Ok(ClusterCoordinator { node_id, raft, state_machine, ring: RwLock::new(ring), data_dir })
    }

    /// Seeds a brand-new cluster with this node as its sole initial voter
    /// (§4.4 "Cluster bootstrap" in the glossary).
    pub async fn bootstrap(&self, rpc_addr: String) -> Result<()> {
        let mut members = BTreeMap::new();
        members.insert(self.node_id, ClusterNode { node_id: self.node_id, rpc_addr });
        self.raft
            .initialize(members)
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        info!(node_id = self.node_id, "cluster bootstrapped");
        Ok(())
    }

    pub async fn add_voter(&self, node_id: NodeId, rpc_addr: String) -> Result<()> {
        self.raft
            .add_learner(node_id, ClusterNode { node_id, rpc_addr }, true)
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        let members: std::collections::BTreeSet<NodeId> =
            self.raft.metrics().borrow().membership_config.voter_ids().chain(std::iter::once(node_id)).collect();
        self.raft
            .change_membership(members, false)
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        Ok(())
    }

    pub async fn remove_voter(&self, node_id: NodeId) -> Result<()> {
        let members: std::collections::BTreeSet<NodeId> = self
            .raft
            .metrics()
            .borrow()
            .membership_config
            .voter_ids()
            .filter(|id| *id != node_id)
            .collect();
        self.raft
            .change_membership(members, false)
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn propose(&self, command: Command) -> Result<()> {
        self.raft
            .client_write(command)
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        self.refresh_ring();
        Ok(())
    }

    pub async fn add_shard(&self, shard_key: String, data: serde_json::Value) -> Result<()> {
        self.propose(Command::AddShard { shard_key, data }).await
    }

    pub async fn remove_shard(&self, shard_key: String) -> Result<()> {
        self.propose(Command::RemoveShard { shard_key }).await
    }

    pub async fn update_shard(&self, shard_key: String, data: serde_json::Value) -> Result<()> {
        self.propose(Command::UpdateShard { shard_key, data }).await
    }

    pub async fn set_index_distribution(&self, index_name: String, shard_keys: Vec<String>) -> Result<()> {
        self.propose(Command::IndexDistribution { index_name, shard_keys }).await
    }

    fn refresh_ring(&self) {
        let entries = self.state_machine.state_machine.read().placement_entries();
        *self.ring.write() = Ring::build(&entries);
    }

    /// The shard key `item` (typically a document id) routes to on this
    /// node's local ring (§4.4, §9's local-ring note).
    pub fn shard_node_for(&self, item: &str) -> Option<String> {
        self.ring.read().locate(item).map(str::to_string)
    }

    /// Whether `node_id` is the placement owner of `shard_key`.
    pub fn is_responsible(&self, shard_key: &str, node_id: &str) -> bool {
        search_types::shard::parse_shard_key(shard_key)
            .map(|(owner, ..)| owner == node_id)
            .unwrap_or(false)
    }

    pub fn shards_for(&self, index_name: &str) -> Vec<String> {
        self.state_machine
            .state_machine
            .read()
            .index_shards
            .get(index_name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> serde_json::Value {
        self.state_machine.state_machine.read().snapshot()
    }

    pub fn restore(&self, value: serde_json::Value) -> Result<()> {
        let restored = ClusterStateMachine::restore(value)?;
        *self.state_machine.state_machine.write() = restored;
        self.refresh_ring();
        Ok(())
    }

    pub fn is_leader(&self) -> bool {
        self.raft.metrics().borrow().current_leader == Some(self.node_id)
    }

    pub fn raft_handle(&self) -> Raft<TypeConfig> {
        self.raft.clone()
    }

    pub fn data_dir(&self) -> &std::path::Path {
        &self.data_dir
    }
}

/// Periodically logs leadership transitions and refreshes the local ring;
/// a placement change from a leader elsewhere still needs to be observed
/// locally once applied (§4.4 "Lifecycle").
pub async fn spawn_leadership_ticker(coordinator: Arc<ClusterCoordinator>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_leader = None;
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(5));
        loop {
            interval.tick().await;
            coordinator.refresh_ring();
            let current = coordinator.raft.metrics().borrow().current_leader;
            if current != last_leader {
                info!(?current, "cluster leadership changed");
                last_leader = current;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_responsible_matches_owning_node() {
        let coordinator_node_matches = search_types::shard::parse_shard_key("n1:idx:r0:s0")
            .map(|(owner, ..)| owner == "n1")
            .unwrap_or(false);
        assert!(coordinator_node_matches);
    }
}
