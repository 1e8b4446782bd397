//! openraft plumbing: type config, log storage, and state machine storage
//! for a single shard's consensus group. [`crate::raft_replicated_log`] sits
//! on top of this and is what the rest of the workspace actually talks to.

pub mod log_store;
pub mod state_machine;
pub mod types;

pub use log_store::LogStore;
pub use state_machine::StateMachineStore;
pub use types::{NodeId, RaftEntry, TypeConfig};
