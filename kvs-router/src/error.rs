use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("no shard covers the given key")]
    NoShard,

    #[error("unknown shard id {0}")]
    UnknownShard(String),

    #[error("invalid split: {0}")]
    InvalidSplit(String),

    #[error("io error persisting metadata: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed metadata file: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type RouterResult<T> = Result<T, RouterError>;
