//! The black-box contract a per-shard consensus implementation must satisfy.

use crate::error::ConsensusResult;
use async_trait::async_trait;

/// A per-shard replicated ordered log. `submit` appends a command on the
/// leader and resolves once it has been committed (replicated to a quorum)
/// and applied locally; on a non-leader it fails with
/// [`crate::error::ConsensusError::NotLeader`].
#[async_trait]
pub trait ReplicatedLog: Send + Sync {
    /// Appends `command` to the log and waits for it to be committed and
    /// applied. Returns `NotLeader` immediately if this replica does not
    /// believe itself to be the leader.
    async fn submit(&self, command: Vec<u8>) -> ConsensusResult<()>;

    /// Best-effort: the authoritative answer is always the eventual result
    /// of `submit`, since leadership may change between this call returning
    /// and the next `submit`.
    fn is_leader(&self) -> bool;
}
