//! Two-phase commit across shards, driven through `kvs-node`'s generated
//! `ShardService` client and routed through a `kvs-router::MetaStore`.

pub mod client;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod retry;

pub use coordinator::TwoPhaseCommitCoordinator;
pub use error::{CoordinatorError, CoordinatorResult};
