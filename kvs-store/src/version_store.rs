//! The versioned, tx-scoped key/value store (`VersionedStore` in the
//! component design): durable multi-version records with commit/abort,
//! built on top of the raw [`Engine`](crate::storage::engine::Engine).
//!
//! Mirrors `kv`'s `mvcc::mvcc::MVCC<E>`, but keyed by an HLC
//! [`Timestamp`] and an explicit `committed` flag per record rather than a
//! snapshot-isolation active-transaction set: Commit simply flips
//! `committed` on every record the transaction wrote, and Read returns the
//! newest committed version at or before the read timestamp, full stop. Two
//! different transactions racing on the same key resolve by timestamp order,
//! not by conflict detection -- that is the model this component is
//! specified to implement.

use std::sync::{Arc, Mutex};

use serde_derive::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CResult;
use crate::key::Key;
use crate::storage::engine::Engine;
use kvs_hlc::Timestamp;

/// A transaction identifier. Opaque, collision-resistant, never reused.
pub type Tx = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VersionRecord {
    value: Vec<u8>,
    tx_id: Tx,
    committed: bool,
}

/// A durable, crash-safe multi-version table with tx-scoped commit/abort,
/// wrapping an underlying [`Engine`] for raw key/value storage.
pub struct VersionedStore<E: Engine> {
    engine: Arc<Mutex<E>>,
}

impl<E: Engine> Clone for VersionedStore<E> {
    fn clone(&self) -> Self {
        Self { engine: self.engine.clone() }
    }
}

impl<E: Engine> VersionedStore<E> {
    pub fn new(engine: E) -> Self {
        Self { engine: Arc::new(Mutex::new(engine)) }
    }

    /// Returns a fresh transaction id. No persistent effect.
    pub fn begin_transaction(&self) -> Tx {
        Uuid::new_v4()
    }

    /// Appends a record `{key, value, ts, tx_id, committed=false}`. No
    /// uniqueness check; fails only on storage I/O error.
    pub fn write(&self, key: &[u8], value: Vec<u8>, tx_id: Tx, ts: Timestamp) -> CResult<()> {
        let record = VersionRecord { value, tx_id, committed: false };
        let mut engine = self.engine.lock().expect("storage engine mutex poisoned");

        let version_key = Key::Version(key.to_vec(), ts.clone()).encode();
        engine.set(&version_key, bincode::serialize(&record)?)?;

        let index_key = Key::TxnWrite(tx_id, key.to_vec(), ts).encode();
        engine.set(&index_key, Vec::new())?;

        engine.flush()
    }

    /// Sets `committed := true` on every record written by `tx_id`.
    /// Idempotent: records already committed are left untouched.
    pub fn commit(&self, tx_id: Tx) -> CResult<()> {
        let mut engine = self.engine.lock().expect("storage engine mutex poisoned");
        let prefix = Key::txn_write_prefix(tx_id);

        let writes = Self::collect_tx_writes(&mut *engine, &prefix)?;
        for (key, ts) in writes {
            let version_key = Key::Version(key.clone(), ts.clone()).encode();
            if let Some(bytes) = engine.get(&version_key)? {
                let mut record: VersionRecord = bincode::deserialize(&bytes)?;
                if !record.committed {
                    record.committed = true;
                    engine.set(&version_key, bincode::serialize(&record)?)?;
                }
            }
            let index_key = Key::TxnWrite(tx_id, key, ts).encode();
            engine.delete(&index_key)?;
        }

        engine.flush()
    }

    /// Deletes every record written by `tx_id` that is not yet committed.
    /// Committed records, if any exist for this `tx_id` from an earlier
    /// Commit call, are left untouched. Idempotent.
    pub fn abort(&self, tx_id: Tx) -> CResult<()> {
        let mut engine = self.engine.lock().expect("storage engine mutex poisoned");
        let prefix = Key::txn_write_prefix(tx_id);

        let writes = Self::collect_tx_writes(&mut *engine, &prefix)?;
        for (key, ts) in writes {
            let version_key = Key::Version(key.clone(), ts.clone()).encode();
            if let Some(bytes) = engine.get(&version_key)? {
                let record: VersionRecord = bincode::deserialize(&bytes)?;
                if !record.committed {
                    engine.delete(&version_key)?;
                }
            }
            let index_key = Key::TxnWrite(tx_id, key, ts).encode();
            engine.delete(&index_key)?;
        }

        engine.flush()
    }

    /// Returns the value of the record matching `key`, `committed = true`,
    /// `ts <= read_ts`, with the greatest `ts`; `None` if no such record
    /// exists.
    pub fn read(&self, key: &[u8], read_ts: &Timestamp) -> CResult<Option<Vec<u8>>> {
        let mut engine = self.engine.lock().expect("storage engine mutex poisoned");
        let prefix = Key::version_prefix(key);

        for entry in engine.scan_dyn(Self::prefix_range(&prefix)).rev() {
            let (engine_key, value) = entry?;
            let ts = match Key::decode(&engine_key)? {
                Key::Version(_, ts) => ts,
                Key::TxnWrite(..) => continue,
            };
            if &ts > read_ts {
                continue;
            }
            let record: VersionRecord = bincode::deserialize(&value)?;
            if record.committed {
                return Ok(Some(record.value));
            }
        }

        Ok(None)
    }

    fn collect_tx_writes(
        engine: &mut E,
        prefix: &[u8],
    ) -> CResult<Vec<(Vec<u8>, Timestamp)>> {
        let mut writes = Vec::new();
        for entry in engine.scan_dyn(Self::prefix_range(prefix)) {
            let (engine_key, _) = entry?;
            if let Key::TxnWrite(_, key, ts) = Key::decode(&engine_key)? {
                writes.push((key, ts));
            }
        }
        Ok(writes)
    }

    fn prefix_range(prefix: &[u8]) -> (std::ops::Bound<Vec<u8>>, std::ops::Bound<Vec<u8>>) {
        let start = std::ops::Bound::Included(prefix.to_vec());
        let end = match prefix.iter().rposition(|b| *b != 0xff) {
            Some(i) => std::ops::Bound::Excluded(
                prefix.iter().take(i).copied().chain(std::iter::once(prefix[i] + 1)).collect(),
            ),
            None => std::ops::Bound::Unbounded,
        };
        (start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::Memory;
    use kvs_hlc::Clock;

    fn store() -> (VersionedStore<Memory>, Clock) {
        (VersionedStore::new(Memory::new()), Clock::new())
    }

    #[test]
    fn write_then_read_before_commit_is_absent() {
        let (store, clock) = store();
        let tx = store.begin_transaction();
        store.write(b"a", b"1".to_vec(), tx, clock.now()).unwrap();
        assert_eq!(store.read(b"a", &clock.now()).unwrap(), None);
    }

    #[test]
    fn commit_makes_writes_visible() {
        let (store, clock) = store();
        let tx = store.begin_transaction();
        store.write(b"a", b"1".to_vec(), tx, clock.now()).unwrap();
        store.commit(tx).unwrap();
        assert_eq!(store.read(b"a", &clock.now()).unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn abort_discards_uncommitted_writes() {
        let (store, clock) = store();
        let tx = store.begin_transaction();
        store.write(b"a", b"1".to_vec(), tx, clock.now()).unwrap();
        store.abort(tx).unwrap();
        assert_eq!(store.read(b"a", &clock.now()).unwrap(), None);
        // idempotent
        store.abort(tx).unwrap();
    }

    #[test]
    fn commit_is_idempotent() {
        let (store, clock) = store();
        let tx = store.begin_transaction();
        store.write(b"a", b"1".to_vec(), tx, clock.now()).unwrap();
        store.commit(tx).unwrap();
        store.commit(tx).unwrap();
        assert_eq!(store.read(b"a", &clock.now()).unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn read_returns_latest_version_at_or_before_read_ts() {
        let (store, clock) = store();
        let tx1 = store.begin_transaction();
        let ts1 = clock.now();
        store.write(b"a", b"1".to_vec(), tx1, ts1.clone()).unwrap();
        store.commit(tx1).unwrap();

        let tx2 = store.begin_transaction();
        let ts2 = clock.now();
        store.write(b"a", b"2".to_vec(), tx2, ts2.clone()).unwrap();
        store.commit(tx2).unwrap();

        assert_eq!(store.read(b"a", &ts1).unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.read(b"a", &ts2).unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn read_ignores_uncommitted_newer_version() {
        let (store, clock) = store();
        let tx1 = store.begin_transaction();
        store.write(b"a", b"1".to_vec(), tx1, clock.now()).unwrap();
        store.commit(tx1).unwrap();

        let tx2 = store.begin_transaction();
        store.write(b"a", b"2".to_vec(), tx2, clock.now()).unwrap();
        // tx2 never commits

        assert_eq!(store.read(b"a", &clock.now()).unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn last_commit_wins_across_transactions_by_timestamp() {
        // Two transactions racing on the same key: whichever ts is greater
        // wins on Read, regardless of commit order. This is the simpler,
        // intentional model this store implements (no conflict detection).
        let (store, clock) = store();
        let tx_a = store.begin_transaction();
        let tx_b = store.begin_transaction();
        let ts_a = clock.now();
        let ts_b = clock.now();

        store.write(b"a", b"from_b".to_vec(), tx_b, ts_b.clone()).unwrap();
        store.commit(tx_b).unwrap();
        store.write(b"a", b"from_a".to_vec(), tx_a, ts_a).unwrap();
        store.commit(tx_a).unwrap();

        assert_eq!(store.read(b"a", &ts_b).unwrap(), Some(b"from_b".to_vec()));
    }
}
