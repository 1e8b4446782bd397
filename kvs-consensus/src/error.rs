use thiserror::Error;

/// Errors surfaced to a `ShardNode` from the consensus layer.
#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("not the leader")]
    NotLeader,

    #[error("transient consensus failure: {0}")]
    TransientFailure(String),

    #[error("fatal replica error: {0}")]
    FatalReplicaError(String),
}

impl From<kvs_store::Error> for ConsensusError {
    fn from(err: kvs_store::Error) -> Self {
        ConsensusError::FatalReplicaError(err.to_string())
    }
}

pub type ConsensusResult<T> = Result<T, ConsensusError>;
