//! openraft wiring: node id/address type and the `TypeConfig` tying the
//! state machine's command/response types to the Raft engine.

use serde::{Deserialize, Serialize};

use crate::state_machine::{Command, CommandResponse};

pub type NodeId = u64;

/// Address of a cluster member, the `Node` generic parameter openraft
/// threads through membership and network dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ClusterNode {
    pub node_id: NodeId,
    pub rpc_addr: String,
}

impl std::fmt::Display for ClusterNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.node_id, self.rpc_addr)
    }
}

openraft::declare_raft_types!(
    pub TypeConfig:
        D = Command,
        R = CommandResponse,
        NodeId = NodeId,
        Node = ClusterNode,
);
