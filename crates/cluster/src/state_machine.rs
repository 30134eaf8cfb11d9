//! The replicated state machine (§4.4): `{placement, index_shards}`,
//! mutated only through the four commands applied from the consensus log.

use std::collections::HashMap;

use search_types::PlacementEntry;
use serde::{Deserialize, Serialize};

/// A command applied to the state machine via the consensus log (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    AddShard { shard_key: String, data: serde_json::Value },
    RemoveShard { shard_key: String },
    UpdateShard { shard_key: String, data: serde_json::Value },
    IndexDistribution { index_name: String, shard_keys: Vec<String> },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandResponse {
    pub applied: bool,
}

/// `{placement: map<shard_key, data>, index_shards: map<index_name, [shard_key]>}`
/// (§4.4). Serialized as JSON for both the Raft snapshot and the
/// on-disk restore path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterStateMachine {
    pub placement: HashMap<String, serde_json::Value>,
    pub index_shards: HashMap<String, Vec<String>>,
}

impl ClusterStateMachine {
    pub fn apply(&mut self, command: Command) -> CommandResponse {
        match command {
            Command::AddShard { shard_key, data } => {
                self.placement.insert(shard_key, data);
            }
            Command::RemoveShard { shard_key } => {
                self.placement.remove(&shard_key);
            }
            Command::UpdateShard { shard_key, data } => {
                self.placement.insert(shard_key, data);
            }
            Command::IndexDistribution { index_name, shard_keys } => {
                self.index_shards.insert(index_name, shard_keys);
            }
        }
        CommandResponse { applied: true }
    }

    /// The current placement entries, for ring construction (§4.4).
    pub fn placement_entries(&self) -> Vec<PlacementEntry> {
        self.placement
            .keys()
            .map(|shard_key| PlacementEntry {
                shard_key: shard_key.clone(),
                node_id: node_id_of(shard_key),
            })
            .collect()
    }

    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("state machine is always JSON-serializable")
    }

    pub fn restore(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

fn node_id_of(shard_key: &str) -> String {
    search_types::shard::parse_shard_key(shard_key)
        .map(|(node_id, _, _, _)| node_id)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_remove_shard_round_trips() {
        let mut sm = ClusterStateMachine::default();
        sm.apply(Command::AddShard {
            shard_key: "n1:idx:r0:s0".to_string(),
            data: serde_json::json!({"addr": "n1:9000"}),
        });
        assert_eq!(sm.placement.len(), 1);
        sm.apply(Command::RemoveShard { shard_key: "n1:idx:r0:s0".to_string() });
        assert!(sm.placement.is_empty());
    }

    #[test]
    fn index_distribution_overwrites_the_shard_list() {
        let mut sm = ClusterStateMachine::default();
        sm.apply(Command::IndexDistribution {
            index_name: "products".to_string(),
            shard_keys: vec!["n1:products:r0:s0".to_string()],
        });
        sm.apply(Command::IndexDistribution {
            index_name: "products".to_string(),
            shard_keys: vec!["n2:products:r0:s0".to_string()],
        });
        assert_eq!(sm.index_shards["products"], vec!["n2:products:r0:s0".to_string()]);
    }

    #[test]
    fn snapshot_and_restore_round_trip() {
        let mut sm = ClusterStateMachine::default();
        sm.apply(Command::AddShard {
            shard_key: "n1:idx:r0:s0".to_string(),
            data: serde_json::json!({}),
        });
        let snap = sm.snapshot();
        let restored = ClusterStateMachine::restore(snap).unwrap();
        assert_eq!(restored.placement.len(), 1);
    }
}
