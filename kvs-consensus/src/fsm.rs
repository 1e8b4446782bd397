//! Deterministic application of committed commands to the versioned store.

use crate::command::Command;
use crate::error::{ConsensusError, ConsensusResult};
use kvs_store::storage::engine::Engine;
use kvs_store::VersionedStore;

/// Receives committed log entries, in log order, from the replicated log.
/// `apply` must be deterministic: no wall-clock reads, no randomness, no
/// state outside of what the log entry itself carries.
pub trait Fsm: Send + Sync {
    fn apply(&self, entry: &[u8]) -> ConsensusResult<()>;
}

/// Translates committed [`Command`]s into [`VersionedStore`] mutations.
///
/// A decode failure or unrecognized command is a violation of I5 (replicated
/// determinism) -- every replica must have agreed on the log, so a command
/// this replica cannot interpret means the replicas have diverged. `apply`
/// returns [`ConsensusError::FatalReplicaError`] in that case; the hosting
/// binary treats it as unrecoverable and exits rather than risk applying a
/// different state than its peers.
pub struct CommandFsm<E: Engine> {
    store: VersionedStore<E>,
}

impl<E: Engine> CommandFsm<E> {
    pub fn new(store: VersionedStore<E>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &VersionedStore<E> {
        &self.store
    }
}

impl<E: Engine> Fsm for CommandFsm<E> {
    fn apply(&self, entry: &[u8]) -> ConsensusResult<()> {
        let command = Command::decode(entry).map_err(|err| {
            ConsensusError::FatalReplicaError(format!("undecodable log entry: {err}"))
        })?;

        match command {
            Command::Write { key, value, tx_id, ts } => {
                self.store.write(&key, value, tx_id, ts)?;
            }
            Command::Commit { tx_id } => {
                self.store.commit(tx_id)?;
            }
            Command::Abort { tx_id } => {
                self.store.abort(tx_id)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvs_hlc::Clock;
    use kvs_store::storage::memory::Memory;
    use uuid::Uuid;

    #[test]
    fn applies_write_then_commit_in_log_order() {
        let fsm = CommandFsm::new(VersionedStore::new(Memory::new()));
        let clock = Clock::new();
        let tx_id = Uuid::new_v4();
        let ts = clock.now();

        let write = Command::Write { key: b"a".to_vec(), value: b"1".to_vec(), tx_id, ts: ts.clone() };
        fsm.apply(&write.encode()).unwrap();
        assert_eq!(fsm.store().read(b"a", &ts).unwrap(), None);

        let commit = Command::Commit { tx_id };
        fsm.apply(&commit.encode()).unwrap();
        assert_eq!(fsm.store().read(b"a", &ts).unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn garbage_entry_is_a_fatal_error() {
        let fsm = CommandFsm::new(VersionedStore::new(Memory::new()));
        let err = fsm.apply(b"not a valid command").unwrap_err();
        assert!(matches!(err, ConsensusError::FatalReplicaError(_)));
    }

    #[test]
    fn two_replicas_fed_the_same_commands_reach_equal_state() {
        // Stands in for I5 (replicated determinism): a real multi-process
        // Raft group isn't exercisable from a unit test, but feeding two
        // independent FSMs the identical command sequence and comparing
        // their resulting visible state is.
        let clock = Clock::new();
        let tx_id = Uuid::new_v4();
        let ts = clock.now();
        let commands = vec![
            Command::Write { key: b"a".to_vec(), value: b"1".to_vec(), tx_id, ts: ts.clone() },
            Command::Commit { tx_id },
        ];

        let replica_a = CommandFsm::new(VersionedStore::new(Memory::new()));
        let replica_b = CommandFsm::new(VersionedStore::new(Memory::new()));
        for command in &commands {
            replica_a.apply(&command.encode()).unwrap();
            replica_b.apply(&command.encode()).unwrap();
        }

        assert_eq!(
            replica_a.store().read(b"a", &ts).unwrap(),
            replica_b.store().read(b"a", &ts).unwrap(),
        );
    }
}
