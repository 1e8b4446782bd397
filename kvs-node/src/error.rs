use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("not the leader")]
    NotLeader,

    #[error("transient failure: {0}")]
    TransientFailure(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl From<kvs_consensus::ConsensusError> for NodeError {
    fn from(err: kvs_consensus::ConsensusError) -> Self {
        match err {
            kvs_consensus::ConsensusError::NotLeader => NodeError::NotLeader,
            kvs_consensus::ConsensusError::TransientFailure(msg) => NodeError::TransientFailure(msg),
            kvs_consensus::ConsensusError::FatalReplicaError(msg) => {
                // A fatal replica error should never reach a client: it means this
                // replica has already diverged and the process is expected to have
                // aborted. Surfaced as transient only so a caller still gets some
                // response if it races with the exit.
                NodeError::TransientFailure(format!("fatal replica error: {msg}"))
            }
        }
    }
}

impl From<kvs_store::Error> for NodeError {
    fn from(err: kvs_store::Error) -> Self {
        NodeError::TransientFailure(err.to_string())
    }
}

pub type NodeResult<T> = Result<T, NodeError>;

/// "not the leader" is the reserved recognizable substring clients grep for
/// in a non-success `message`.
pub const NOT_LEADER_MESSAGE: &str = "not the leader";
