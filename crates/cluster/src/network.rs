//! TCP transport for Raft RPCs (§4.4 mandates a TCP transport). Each RPC
//! is a single request/response exchange over a freshly dialed
//! connection, framed as a 4-byte big-endian length prefix followed by a
//! JSON body.

use std::io;

use openraft::error::{InstallSnapshotError, RPCError, RaftError, Unreachable};
use openraft::network::{RaftNetwork, RaftNetworkFactory};
use openraft::raft::{
    AppendEntriesRequest, AppendEntriesResponse, InstallSnapshotRequest, InstallSnapshotResponse, VoteRequest,
    VoteResponse,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::types::{ClusterNode, NodeId, TypeConfig};

#[derive(Clone, Default)]
pub struct TcpNetworkFactory;

impl RaftNetworkFactory<TypeConfig> for TcpNetworkFactory {
    type Network = TcpNetwork;

    async fn new_client(&mut self, _target: NodeId, node: &ClusterNode) -> Self::Network {
        TcpNetwork { addr: node.rpc_addr.clone() }
    }
}

pub struct TcpNetwork {
    addr: String,
}

async fn send_frame<Req: Serialize, Resp: DeserializeOwned>(
    addr: &str,
    path: &str,
    req: &Req,
) -> io::Result<Resp> {
    let mut stream = TcpStream::connect(addr).await?;
    let path_bytes = path.as_bytes();
    stream.write_u16(path_bytes.len() as u16).await?;
    stream.write_all(path_bytes).await?;

    let body = serde_json::to_vec(req)?;
    stream.write_u32(body.len() as u32).await?;
    stream.write_all(&body).await?;
    stream.flush().await?;

    let len = stream.read_u32().await?;
    let mut buf = vec![0u8; len as usize];
    stream.read_exact(&mut buf).await?;
    serde_json::from_slice(&buf).map_err(io::Error::from)
}

impl RaftNetwork<TypeConfig> for TcpNetwork {
    async fn append_entries(
        &mut self,
        req: AppendEntriesRequest<TypeConfig>,
        _option: openraft::network::RPCOption,
    ) -> Result<AppendEntriesResponse<NodeId>, RPCError<NodeId, ClusterNode, RaftError<NodeId>>> {
        send_frame(&self.addr, "append_entries", &req)
            .await
            .map_err(|e| RPCError::Unreachable(Unreachable::new(&e)))
    }

    async fn install_snapshot(
        &mut self,
        req: InstallSnapshotRequest<TypeConfig>,
        _option: openraft::network::RPCOption,
    ) -> Result<InstallSnapshotResponse<NodeId>, RPCError<NodeId, ClusterNode, RaftError<NodeId, InstallSnapshotError>>>
    {
        send_frame(&self.addr, "install_snapshot", &req)
            .await
            .map_err(|e| RPCError::Unreachable(Unreachable::new(&e)))
    }

    async fn vote(
        &mut self,
        req: VoteRequest<NodeId>,
        _option: openraft::network::RPCOption,
    ) -> Result<VoteResponse<NodeId>, RPCError<NodeId, ClusterNode, RaftError<NodeId>>> {
        send_frame(&self.addr, "vote", &req)
            .await
            .map_err(|e| RPCError::Unreachable(Unreachable::new(&e)))
    }
}

/// Server-side: the raw TCP loop a node runs to accept the RPCs the
/// [`TcpNetwork`] client above sends. Dispatches by the path string read
/// from each frame's header onto the local `openraft::Raft` handle.
pub async fn serve(
    listener: tokio::net::TcpListener,
    raft: openraft::Raft<TypeConfig>,
) -> io::Result<()> {
    loop {
        let (mut stream, peer) = listener.accept().await?;
        let raft = raft.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(&mut stream, &raft).await {
                tracing::warn!(%peer, error = %e, "raft rpc connection failed");
            }
        });
    }
}

async fn handle_connection(stream: &mut TcpStream, raft: &openraft::Raft<TypeConfig>) -> io::Result<()> {
    let path_len = stream.read_u16().await?;
    let mut path_buf = vec![0u8; path_len as usize];
    stream.read_exact(&mut path_buf).await?;
    let path = String::from_utf8_lossy(&path_buf).to_string();

    let body_len = stream.read_u32().await?;
    let mut body = vec![0u8; body_len as usize];
    stream.read_exact(&mut body).await?;

    let response_bytes = match path.as_str() {
        "append_entries" => {
            let req: AppendEntriesRequest<TypeConfig> = serde_json::from_slice(&body)?;
            let resp = raft
                .append_entries(req)
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            serde_json::to_vec(&resp)?
        }
        "vote" => {
            let req: VoteRequest<NodeId> = serde_json::from_slice(&body)?;
            let resp = raft
                .vote(req)
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            serde_json::to_vec(&resp)?
        }
        "install_snapshot" => {
            let req: InstallSnapshotRequest<TypeConfig> = serde_json::from_slice(&body)?;
            let resp = raft
                .install_snapshot(req)
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            serde_json::to_vec(&resp)?
        }
        other => return Err(io::Error::new(io::ErrorKind::InvalidData, format!("unknown rpc path {other}"))),
    };

    stream.write_u32(response_bytes.len() as u32).await?;
    stream.write_all(&response_bytes).await?;
    stream.flush().await?;
    Ok(())
}
