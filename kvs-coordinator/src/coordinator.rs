//! Two-phase commit across the shards a write set touches.
//!
//! Partition by `Route(key).nodes[0]`, Prepare every participant
//! (BeginTransaction + Write per key), then Commit all-or-abort-all. Once a
//! single Commit has succeeded, the protocol is committed to completing:
//! any further Commit failure is retried indefinitely rather than aborted,
//! per the standard 2PC rule this system follows.

use std::collections::HashMap;
use std::sync::Arc;

use kvs_router::MetaStore;

use crate::client::ShardClient;
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::retry::CommitRetry;

pub struct TwoPhaseCommitCoordinator {
    meta: Arc<MetaStore>,
}

struct Prepared {
    client: ShardClient,
    tx_id: String,
}

impl TwoPhaseCommitCoordinator {
    pub fn new(meta: Arc<MetaStore>) -> Self {
        Self { meta }
    }

    pub async fn commit(&self, writes: Vec<(Vec<u8>, Vec<u8>)>) -> CoordinatorResult<()> {
        let partition = self.partition(writes)?;

        let mut prepared: HashMap<String, Prepared> = HashMap::new();
        let prepare_result = self.prepare(partition, &mut prepared).await;

        if let Err(err) = prepare_result {
            tracing::warn!(%err, "2pc prepare failed, aborting all reached participants");
            self.abort_all(prepared).await;
            return Err(err);
        }

        self.commit_all(prepared).await
    }

    fn partition(
        &self,
        writes: Vec<(Vec<u8>, Vec<u8>)>,
    ) -> CoordinatorResult<HashMap<String, Vec<(Vec<u8>, Vec<u8>)>>> {
        let mut partition: HashMap<String, Vec<(Vec<u8>, Vec<u8>)>> = HashMap::new();
        for (key, value) in writes {
            let key_str = String::from_utf8_lossy(&key).into_owned();
            let shard = self.meta.route(&key_str)?;
            let leader = shard
                .nodes
                .first()
                .cloned()
                .ok_or_else(|| CoordinatorError::Rejected {
                    address: shard.id.clone(),
                    message: "shard has no nodes".to_string(),
                })?;
            partition.entry(leader).or_default().push((key, value));
        }
        Ok(partition)
    }

    async fn prepare(
        &self,
        partition: HashMap<String, Vec<(Vec<u8>, Vec<u8>)>>,
        prepared: &mut HashMap<String, Prepared>,
    ) -> CoordinatorResult<()> {
        for (address, writes) in partition {
            let mut client = ShardClient::connect(&address).await?;
            let tx_id = client.begin_transaction().await?;
            // Record the participant the moment it's began, not after its
            // writes finish -- a write failing partway through still leaves
            // this participant holding an uncommitted transaction that must
            // be sent Abort.
            prepared.insert(address.clone(), Prepared { client, tx_id: tx_id.clone() });
            let entry = prepared.get_mut(&address).expect("just inserted");
            for (key, value) in writes {
                entry.client.write(key, value, tx_id.clone()).await?;
            }
        }
        Ok(())
    }

    async fn commit_all(&self, prepared: HashMap<String, Prepared>) -> CoordinatorResult<()> {
        let mut any_committed = false;
        let mut remaining: Vec<(String, Prepared)> = prepared.into_iter().collect();

        // First pass: try every participant once, in order. A failure before
        // any success lets us still abort everyone else untouched; once one
        // participant has committed, the protocol is committed to finishing
        // and failures only get queued for indefinite retry.
        let mut retry_queue = Vec::new();
        while let Some((address, mut entry)) = remaining.pop() {
            match entry.client.commit(entry.tx_id.clone()).await {
                Ok(()) => any_committed = true,
                Err(err) => {
                    if any_committed {
                        tracing::error!(
                            %address, %err,
                            "commit failed after another participant already committed; retrying indefinitely, not aborting"
                        );
                        retry_queue.push((address, entry));
                    } else {
                        tracing::warn!(%err, "commit failed before any participant committed; aborting the rest");
                        entry.client.abort(entry.tx_id).await;
                        self.abort_all(remaining.into_iter().collect()).await;
                        return Err(err);
                    }
                }
            }
        }

        // Remaining participants are now "commit-uncertain": retry with
        // bounded backoff until every one of them succeeds.
        for (address, mut entry) in retry_queue {
            let mut retry = CommitRetry::new();
            loop {
                match entry.client.commit(entry.tx_id.clone()).await {
                    Ok(()) => break,
                    Err(err) => {
                        let delay = retry.next_delay();
                        tracing::warn!(%address, %err, ?delay, "retrying commit-uncertain participant");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn abort_all(&self, prepared: HashMap<String, Prepared>) {
        for (_, mut entry) in prepared {
            entry.client.abort(entry.tx_id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use kvs_node::proto::shard_service_server::{ShardService, ShardServiceServer};
    use kvs_node::proto::{
        AbortRequest, AbortResponse, BeginTransactionRequest, BeginTransactionResponse, CommitRequest,
        CommitResponse, ReadRequest, ReadResponse, WriteRequest, WriteResponse,
    };
    use tonic::{Request, Response, Status};

    use super::*;

    /// A `ShardService` that always begins successfully but always rejects
    /// the write, recording every tx_id it is sent Abort for.
    #[derive(Default)]
    struct RejectsWrites {
        aborted_tx_ids: Arc<StdMutex<Vec<String>>>,
    }

    #[tonic::async_trait]
    impl ShardService for RejectsWrites {
        async fn begin_transaction(
            &self,
            _request: Request<BeginTransactionRequest>,
        ) -> Result<Response<BeginTransactionResponse>, Status> {
            Ok(Response::new(BeginTransactionResponse { tx_id: "fake-tx".to_string() }))
        }

        async fn write(&self, _request: Request<WriteRequest>) -> Result<Response<WriteResponse>, Status> {
            Ok(Response::new(WriteResponse { success: false, message: "forced failure".to_string() }))
        }

        async fn read(&self, _request: Request<ReadRequest>) -> Result<Response<ReadResponse>, Status> {
            Ok(Response::new(ReadResponse { value: Vec::new() }))
        }

        async fn commit(&self, _request: Request<CommitRequest>) -> Result<Response<CommitResponse>, Status> {
            Ok(Response::new(CommitResponse { success: true, message: String::new() }))
        }

        async fn abort(&self, request: Request<AbortRequest>) -> Result<Response<AbortResponse>, Status> {
            self.aborted_tx_ids.lock().unwrap().push(request.into_inner().tx_id);
            Ok(Response::new(AbortResponse { success: true, message: String::new() }))
        }
    }

    async fn spawn_fake_shard() -> (String, Arc<StdMutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let aborted = Arc::new(StdMutex::new(Vec::new()));
        let shard = RejectsWrites { aborted_tx_ids: aborted.clone() };
        tokio::spawn(async move {
            tonic::transport::Server::builder()
                .add_service(ShardServiceServer::new(shard))
                .serve(addr)
                .await
                .unwrap();
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        (addr.to_string(), aborted)
    }

    #[tokio::test]
    async fn prepare_aborts_a_participant_whose_write_failed_after_begin_succeeded() {
        let (address, aborted) = spawn_fake_shard().await;
        let meta_dir = tempfile::tempdir().unwrap();
        let meta = Arc::new(MetaStore::open(meta_dir.path()).unwrap());
        let coordinator = TwoPhaseCommitCoordinator::new(meta);

        let mut partition = HashMap::new();
        partition.insert(address, vec![(b"k".to_vec(), b"v".to_vec())]);

        let mut prepared: HashMap<String, Prepared> = HashMap::new();
        let result = coordinator.prepare(partition, &mut prepared).await;

        assert!(result.is_err(), "write failure must surface as an error");
        assert!(
            aborted.lock().unwrap().is_empty(),
            "prepare itself must not send Abort -- that's the caller's job"
        );

        coordinator.abort_all(prepared).await;
        assert_eq!(
            aborted.lock().unwrap().as_slice(),
            &["fake-tx".to_string()],
            "the participant that began-and-wrote must still be sent Abort even though its write failed"
        );
    }
}
