//! openraft type configuration for a shard's consensus group.

use crate::command::Command;

openraft::declare_raft_types!(
    pub TypeConfig:
        D = Command,
        R = (),
        NodeId = u64,
        Node = openraft::BasicNode,
        Entry = openraft::Entry<TypeConfig>,
        SnapshotData = std::io::Cursor<Vec<u8>>,
        AsyncRuntime = openraft::TokioRuntime,
);

pub type NodeId = <TypeConfig as openraft::RaftTypeConfig>::NodeId;
pub type RaftEntry = <TypeConfig as openraft::RaftTypeConfig>::Entry;
