//! HTTP transport for openraft's internal AppendEntries/Vote/InstallSnapshot
//! RPCs, following the same shape as openraft's own in-memory example
//! network: plain JSON over `reqwest` for the client side, an `axum` router
//! for the server side. Kept separate from the `ShardService` tonic surface
//! in [`crate::service`], which is the only wire contract the client sees.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use openraft::error::{NetworkError, RPCError, RaftError, RemoteError};
use openraft::network::{RPCOption, RaftNetwork, RaftNetworkFactory};
use openraft::raft::{
    AppendEntriesRequest, AppendEntriesResponse, InstallSnapshotRequest, InstallSnapshotResponse,
    VoteRequest, VoteResponse,
};
use openraft::{BasicNode, Raft};
use serde::de::DeserializeOwned;
use serde::Serialize;

use kvs_consensus::raft::{NodeId, TypeConfig};

/// Hands out one [`HttpRaftNetwork`] per target replica; the factory itself
/// holds no per-target state, the target address lives on the `BasicNode`
/// openraft already tracks per member.
#[derive(Clone, Default)]
pub struct HttpRaftNetworkFactory {
    client: reqwest::Client,
}

impl HttpRaftNetworkFactory {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl RaftNetworkFactory<TypeConfig> for HttpRaftNetworkFactory {
    type Network = HttpRaftNetwork;

    async fn new_client(&mut self, target: NodeId, node: &BasicNode) -> Self::Network {
        HttpRaftNetwork { client: self.client.clone(), target, target_node: node.clone() }
    }
}

pub struct HttpRaftNetwork {
    client: reqwest::Client,
    target: NodeId,
    target_node: BasicNode,
}

impl HttpRaftNetwork {
    async fn send_rpc<Req, Resp, Err>(
        &self,
        path: &str,
        req: &Req,
    ) -> Result<Resp, RPCError<NodeId, BasicNode, Err>>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
        Err: std::error::Error + DeserializeOwned,
    {
        let url = format!("http://{}/{}", self.target_node.addr, path);
        let response = self
            .client
            .post(&url)
            .json(req)
            .send()
            .await
            .map_err(|err| RPCError::Network(NetworkError::new(&err)))?;

        let body: Result<Resp, Err> = response
            .json()
            .await
            .map_err(|err| RPCError::Network(NetworkError::new(&err)))?;

        body.map_err(|err| RPCError::RemoteError(RemoteError::new(self.target, err)))
    }
}

impl RaftNetwork<TypeConfig> for HttpRaftNetwork {
    async fn append_entries(
        &mut self,
        rpc: AppendEntriesRequest<TypeConfig>,
        _option: RPCOption,
    ) -> Result<AppendEntriesResponse<NodeId>, RPCError<NodeId, BasicNode, RaftError<NodeId>>> {
        self.send_rpc("raft/append-entries", &rpc).await
    }

    async fn vote(
        &mut self,
        rpc: VoteRequest<NodeId>,
        _option: RPCOption,
    ) -> Result<VoteResponse<NodeId>, RPCError<NodeId, BasicNode, RaftError<NodeId>>> {
        self.send_rpc("raft/vote", &rpc).await
    }

    async fn install_snapshot(
        &mut self,
        rpc: InstallSnapshotRequest<TypeConfig>,
        _option: RPCOption,
    ) -> Result<
        InstallSnapshotResponse<NodeId>,
        RPCError<NodeId, BasicNode, openraft::error::InstallSnapshotError>,
    > {
        self.send_rpc("raft/install-snapshot", &rpc).await
    }
}

/// Server side of the same three RPCs, dispatched straight into the local
/// `openraft::Raft` handle. Mounted on the node's `RAFT_ADDR` listener,
/// separate from the client-facing `ShardService` port.
pub fn router(raft: Raft<TypeConfig>) -> Router {
    Router::new()
        .route("/raft/append-entries", post(append_entries))
        .route("/raft/vote", post(vote))
        .route("/raft/install-snapshot", post(install_snapshot))
        .with_state(raft)
}

async fn append_entries(
    State(raft): State<Raft<TypeConfig>>,
    Json(req): Json<AppendEntriesRequest<TypeConfig>>,
) -> Json<Result<AppendEntriesResponse<NodeId>, RaftError<NodeId>>> {
    Json(raft.append_entries(req).await)
}

async fn vote(
    State(raft): State<Raft<TypeConfig>>,
    Json(req): Json<VoteRequest<NodeId>>,
) -> Json<Result<VoteResponse<NodeId>, RaftError<NodeId>>> {
    Json(raft.vote(req).await)
}

async fn install_snapshot(
    State(raft): State<Raft<TypeConfig>>,
    Json(req): Json<InstallSnapshotRequest<TypeConfig>>,
) -> Json<Result<InstallSnapshotResponse<NodeId>, openraft::error::InstallSnapshotError>> {
    Json(raft.install_snapshot(req).await)
}
