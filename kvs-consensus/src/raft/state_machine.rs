//! Wires openraft's `RaftStateMachine` to our [`CommandFsm`].
//!
//! Snapshotting is a no-op: on restart we recover entirely by replaying the
//! log against a fresh `CommandFsm`, the same posture `original_source`'s
//! `raftstore` took (`noopSnapshot`). Revisit once shard logs grow large
//! enough that full replay on restart becomes expensive.

use std::sync::Arc;

use async_trait::async_trait;
use openraft::storage::{RaftSnapshotBuilder, RaftStateMachine};
use openraft::{
    EntryPayload, LogId, OptionalSend, Snapshot, SnapshotMeta, StorageError, StoredMembership,
};
use tokio::sync::Mutex;

use super::types::{NodeId, RaftEntry, TypeConfig};
use crate::fsm::{CommandFsm, Fsm};
use kvs_store::storage::engine::Engine;

struct Applied {
    log_id: Option<LogId<NodeId>>,
    membership: StoredMembership<TypeConfig>,
}

/// The durable side effect of applying a committed entry lives in
/// `CommandFsm` (and, beneath it, `VersionedStore`); this type only tracks
/// the bookkeeping openraft itself needs (last applied log id, membership).
pub struct StateMachineStore<E: Engine> {
    fsm: Arc<CommandFsm<E>>,
    applied: Mutex<Applied>,
}

impl<E: Engine> StateMachineStore<E> {
    pub fn new(fsm: Arc<CommandFsm<E>>) -> Self {
        Self {
            fsm,
            applied: Mutex::new(Applied { log_id: None, membership: StoredMembership::default() }),
        }
    }
}

pub struct NoopSnapshotBuilder;

#[async_trait]
impl RaftSnapshotBuilder<TypeConfig> for NoopSnapshotBuilder {
    async fn build_snapshot(&mut self) -> Result<Snapshot<TypeConfig>, StorageError<NodeId>> {
        unreachable!("snapshotting is not implemented; shards recover by full log replay")
    }
}

#[async_trait]
impl<E: Engine + 'static> RaftStateMachine<TypeConfig> for StateMachineStore<E> {
    type SnapshotBuilder = NoopSnapshotBuilder;

    async fn applied_state(
        &mut self,
    ) -> Result<(Option<LogId<NodeId>>, StoredMembership<TypeConfig>), StorageError<NodeId>> {
        let applied = self.applied.lock().await;
        Ok((applied.log_id, applied.membership.clone()))
    }

    async fn apply<I>(&mut self, entries: I) -> Result<Vec<()>, StorageError<NodeId>>
    where
        I: IntoIterator<Item = RaftEntry> + OptionalSend,
    {
        let mut results = Vec::new();
        let mut applied = self.applied.lock().await;
        for entry in entries {
            applied.log_id = Some(entry.log_id);
            match entry.payload {
                EntryPayload::Blank => {}
                EntryPayload::Normal(command) => {
                    self.fsm.apply(&command.encode()).unwrap_or_else(|err| {
                        tracing::error!(%err, "fatal replica error applying committed entry");
                        std::process::exit(1);
                    });
                }
                EntryPayload::Membership(membership) => {
                    applied.membership = StoredMembership::new(Some(entry.log_id), membership);
                }
            }
            results.push(());
        }
        Ok(results)
    }

    async fn begin_receiving_snapshot(
        &mut self,
    ) -> Result<Box<std::io::Cursor<Vec<u8>>>, StorageError<NodeId>> {
        Ok(Box::new(std::io::Cursor::new(Vec::new())))
    }

    async fn install_snapshot(
        &mut self,
        _meta: &SnapshotMeta<TypeConfig>,
        _snapshot: Box<std::io::Cursor<Vec<u8>>>,
    ) -> Result<(), StorageError<NodeId>> {
        unreachable!("snapshot installation is not implemented")
    }

    async fn get_current_snapshot(
        &mut self,
    ) -> Result<Option<Snapshot<TypeConfig>>, StorageError<NodeId>> {
        Ok(None)
    }

    async fn get_snapshot_builder(&mut self) -> Self::SnapshotBuilder {
        NoopSnapshotBuilder
    }
}
