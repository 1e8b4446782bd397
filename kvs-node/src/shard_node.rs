//! The per-replica request handler: leader-only Begin/Write/Commit/Abort
//! routed through the replicated log, Read served locally regardless of
//! leadership.

use std::sync::Arc;
use std::time::Duration;

use kvs_consensus::{Command, ConsensusError, ReplicatedLog};
use kvs_hlc::{Clock, Timestamp};
use kvs_store::storage::engine::Engine;
use kvs_store::{Tx, VersionedStore};
use uuid::Uuid;

use crate::error::{NodeError, NodeResult};

const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ShardNode<E: Engine> {
    store: VersionedStore<E>,
    log: Arc<dyn ReplicatedLog>,
    clock: Clock,
    submit_timeout: Duration,
}

impl<E: Engine> ShardNode<E> {
    pub fn new(store: VersionedStore<E>, log: Arc<dyn ReplicatedLog>, clock: Clock) -> Self {
        Self { store, log, clock, submit_timeout: DEFAULT_SUBMIT_TIMEOUT }
    }

    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    fn check_leader(&self) -> NodeResult<()> {
        if self.log.is_leader() {
            Ok(())
        } else {
            Err(NodeError::NotLeader)
        }
    }

    /// The tx-id is minted locally on whichever replica is leader at the
    /// time and handed to the client; no log entry is created for Begin.
    /// The first Write carrying this tx-id is the implicit Begin on every
    /// other replica.
    pub fn begin_transaction(&self) -> NodeResult<Tx> {
        self.check_leader()?;
        Ok(Uuid::new_v4())
    }

    pub async fn write(&self, key: Vec<u8>, value: Vec<u8>, tx_id: Tx) -> NodeResult<()> {
        self.check_leader()?;
        let ts = self.clock.now();
        let command = Command::Write { key, value, tx_id, ts };
        self.submit(command).await
    }

    pub async fn commit(&self, tx_id: Tx) -> NodeResult<()> {
        self.check_leader()?;
        self.submit(Command::Commit { tx_id }).await
    }

    pub async fn abort(&self, tx_id: Tx) -> NodeResult<()> {
        self.check_leader()?;
        self.submit(Command::Abort { tx_id }).await
    }

    /// Served from this replica's local store regardless of leadership --
    /// follower reads are permitted and may lag the leader's applied index.
    pub fn read(&self, key: &[u8], read_ts: Option<Timestamp>) -> NodeResult<Option<Vec<u8>>> {
        let ts = read_ts.unwrap_or_else(|| self.clock.now());
        Ok(self.store.read(key, &ts)?)
    }

    async fn submit(&self, command: Command) -> NodeResult<()> {
        let fut = self.log.submit(command.encode());
        match tokio::time::timeout(self.submit_timeout, fut).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(ConsensusError::NotLeader)) => Err(NodeError::NotLeader),
            Ok(Err(err)) => Err(err.into()),
            Err(_elapsed) => Err(NodeError::TransientFailure(
                "consensus submit deadline exceeded".to_string(),
            )),
        }
    }
}
