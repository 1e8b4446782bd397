//! Translates [`ShardNode`] outcomes into the tonic-generated wire shape.

use std::sync::Arc;

use kvs_hlc::Timestamp;
use kvs_store::storage::engine::Engine;
use tonic::{Request, Response, Status};
use uuid::Uuid;

use crate::error::{NodeError, NOT_LEADER_MESSAGE};
use crate::proto::shard_service_server::ShardService;
use crate::proto::{
    AbortRequest, AbortResponse, BeginTransactionRequest, BeginTransactionResponse, CommitRequest,
    CommitResponse, ReadRequest, ReadResponse, WriteRequest, WriteResponse,
};
use crate::shard_node::ShardNode;

pub struct ShardGrpcService<E: Engine> {
    node: Arc<ShardNode<E>>,
}

impl<E: Engine> ShardGrpcService<E> {
    pub fn new(node: Arc<ShardNode<E>>) -> Self {
        Self { node }
    }
}

fn outcome(result: Result<(), NodeError>) -> (bool, String) {
    match result {
        Ok(()) => (true, String::new()),
        Err(NodeError::NotLeader) => (false, NOT_LEADER_MESSAGE.to_string()),
        Err(err) => (false, err.to_string()),
    }
}

fn parse_tx_id(raw: &str) -> Result<Uuid, Status> {
    Uuid::parse_str(raw).map_err(|_| Status::invalid_argument("malformed tx_id"))
}

#[tonic::async_trait]
impl<E: Engine + Send + Sync + 'static> ShardService for ShardGrpcService<E> {
    async fn begin_transaction(
        &self,
        _request: Request<BeginTransactionRequest>,
    ) -> Result<Response<BeginTransactionResponse>, Status> {
        match self.node.begin_transaction() {
            Ok(tx_id) => Ok(Response::new(BeginTransactionResponse { tx_id: tx_id.to_string() })),
            Err(NodeError::NotLeader) => Err(Status::failed_precondition(NOT_LEADER_MESSAGE)),
            Err(err) => Err(Status::internal(err.to_string())),
        }
    }

    async fn write(&self, request: Request<WriteRequest>) -> Result<Response<WriteResponse>, Status> {
        let req = request.into_inner();
        let tx_id = parse_tx_id(&req.tx_id)?;
        let result = self.node.write(req.key, req.value, tx_id).await;
        let (success, message) = outcome(result);
        Ok(Response::new(WriteResponse { success, message }))
    }

    async fn read(&self, request: Request<ReadRequest>) -> Result<Response<ReadResponse>, Status> {
        let req = request.into_inner();
        let read_ts = if req.read_timestamp.is_empty() {
            None
        } else {
            Some(
                Timestamp::parse(&req.read_timestamp)
                    .ok_or_else(|| Status::invalid_argument("malformed read_timestamp"))?,
            )
        };
        let value = self
            .node
            .read(&req.key, read_ts)
            .map_err(|err| Status::internal(err.to_string()))?;
        Ok(Response::new(ReadResponse { value: value.unwrap_or_default() }))
    }

    async fn commit(&self, request: Request<CommitRequest>) -> Result<Response<CommitResponse>, Status> {
        let req = request.into_inner();
        let tx_id = parse_tx_id(&req.tx_id)?;
        let (success, message) = outcome(self.node.commit(tx_id).await);
        Ok(Response::new(CommitResponse { success, message }))
    }

    async fn abort(&self, request: Request<AbortRequest>) -> Result<Response<AbortResponse>, Status> {
        let req = request.into_inner();
        let tx_id = parse_tx_id(&req.tx_id)?;
        let (success, message) = outcome(self.node.abort(tx_id).await);
        Ok(Response::new(AbortResponse { success, message }))
    }
}
