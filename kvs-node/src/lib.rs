//! The per-replica gRPC facade: `ShardNode` owns a `VersionedStore` and a
//! `ReplicatedLog` handle; `ShardGrpcService` wraps it for tonic.

pub mod error;
pub mod raft_network;
pub mod service;
pub mod shard_node;

pub mod proto {
    tonic::include_proto!("kvs.shard");
}

pub use error::{NodeError, NodeResult};
pub use raft_network::{HttpRaftNetwork, HttpRaftNetworkFactory};
pub use service::ShardGrpcService;
pub use shard_node::ShardNode;
