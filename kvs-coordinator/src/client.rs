//! A thin wrapper around the generated `ShardService` client, opened lazily
//! per coordinator invocation and reused for every write the coordinator
//! sends to the same participant.

use kvs_node::proto::shard_service_client::ShardServiceClient;
use kvs_node::proto::{
    AbortRequest, BeginTransactionRequest, CommitRequest, WriteRequest,
};
use tonic::transport::Channel;

use crate::error::{CoordinatorError, CoordinatorResult};

pub struct ShardClient {
    address: String,
    inner: ShardServiceClient<Channel>,
}

impl ShardClient {
    pub async fn connect(address: &str) -> CoordinatorResult<Self> {
        let endpoint = format!("http://{address}");
        let inner = ShardServiceClient::connect(endpoint)
            .await
            .map_err(|source| CoordinatorError::Transport { address: address.to_string(), source })?;
        Ok(Self { address: address.to_string(), inner })
    }

    pub async fn begin_transaction(&mut self) -> CoordinatorResult<String> {
        let resp = self.inner.begin_transaction(BeginTransactionRequest {}).await?;
        Ok(resp.into_inner().tx_id)
    }

    pub async fn write(&mut self, key: Vec<u8>, value: Vec<u8>, tx_id: String) -> CoordinatorResult<()> {
        let resp = self.inner.write(WriteRequest { key, value, tx_id }).await?.into_inner();
        if resp.success {
            Ok(())
        } else {
            Err(CoordinatorError::Rejected { address: self.address.clone(), message: resp.message })
        }
    }

    pub async fn commit(&mut self, tx_id: String) -> CoordinatorResult<()> {
        let resp = self.inner.commit(CommitRequest { tx_id }).await?.into_inner();
        if resp.success {
            Ok(())
        } else {
            Err(CoordinatorError::Rejected { address: self.address.clone(), message: resp.message })
        }
    }

    /// Best-effort: the abort path never propagates a failure, it only logs.
    pub async fn abort(&mut self, tx_id: String) {
        if let Err(err) = self.inner.abort(AbortRequest { tx_id }).await {
            tracing::warn!(address = %self.address, %err, "abort rpc failed, participant left to time out its prepared transaction");
        }
    }
}
