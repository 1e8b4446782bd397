use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("routing: {0}")]
    Routing(#[from] kvs_router::RouterError),

    #[error("could not reach {address}: {source}")]
    Transport { address: String, source: tonic::transport::Error },

    #[error("shard rpc failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("participant {address} rejected the transaction: {message}")]
    Rejected { address: String, message: String },

    #[error("transaction aborted across all participants")]
    Aborted,
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
