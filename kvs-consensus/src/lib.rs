//! Per-shard replicated log: a committed, deterministically-applied command
//! stream sitting on top of `kvs-store`'s `VersionedStore`.
//!
//! Everything above [`ReplicatedLog`] talks to this crate purely through that
//! trait: callers never need to know consensus is openraft under the hood.

pub mod command;
pub mod error;
pub mod fsm;
pub mod raft;
pub mod raft_replicated_log;
pub mod replicated_log;

pub use command::Command;
pub use error::{ConsensusError, ConsensusResult};
pub use fsm::{CommandFsm, Fsm};
pub use raft_replicated_log::RaftReplicatedLog;
pub use replicated_log::ReplicatedLog;
