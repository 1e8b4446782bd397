//! Adapts `openraft::Raft` to the [`ReplicatedLog`] contract.
//!
//! This crate deliberately has no opinion on the RPC transport between raft
//! peers -- that's a `kvs-node` concern, wired in through the `N: RaftNetworkFactory`
//! type parameter (a tonic-backed implementation in practice). Keeping the
//! network factory generic here means `kvs-consensus` depends on openraft but
//! not on tonic.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use openraft::error::{ClientWriteError, RaftError};
use openraft::network::RaftNetworkFactory;
use openraft::{BasicNode, Config, Raft};

use crate::command::Command;
use crate::error::{ConsensusError, ConsensusResult};
use crate::fsm::CommandFsm;
use crate::raft::{LogStore, NodeId, StateMachineStore, TypeConfig};
use crate::replicated_log::ReplicatedLog;
use kvs_store::storage::engine::Engine;

/// A single shard's consensus group, fronted by the [`ReplicatedLog`] trait.
pub struct RaftReplicatedLog<E: Engine> {
    node_id: NodeId,
    raft: Raft<TypeConfig>,
    _marker: std::marker::PhantomData<E>,
}

impl<E: Engine + 'static> RaftReplicatedLog<E> {
    /// Brings up a shard's raft group, bootstrapping single-decree membership
    /// from `voters` if the log is empty. Mirrors `original_source`'s
    /// `raft.BootstrapCluster(config)` call gated on `!hasState`: an
    /// already-initialized log (restart) skips bootstrap entirely.
    pub async fn new<N>(
        node_id: NodeId,
        config: Arc<Config>,
        network: N,
        log_store: LogStore,
        fsm: Arc<CommandFsm<E>>,
        voters: BTreeMap<NodeId, BasicNode>,
    ) -> ConsensusResult<Self>
    where
        N: RaftNetworkFactory<TypeConfig>,
    {
        let state_machine = StateMachineStore::new(fsm);
        let raft = Raft::new(node_id, config, network, log_store, state_machine)
            .await
            .map_err(|err| ConsensusError::TransientFailure(err.to_string()))?;

        let is_initialized = {
            let metrics = raft.metrics();
            metrics.borrow().current_term > 0 || metrics.borrow().last_log_index.is_some()
        };
        if !is_initialized && !voters.is_empty() {
            raft.initialize(voters)
                .await
                .map_err(|err| ConsensusError::TransientFailure(err.to_string()))?;
        }

        Ok(Self { node_id, raft, _marker: std::marker::PhantomData })
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn raft(&self) -> &Raft<TypeConfig> {
        &self.raft
    }
}

#[async_trait]
impl<E: Engine + 'static> ReplicatedLog for RaftReplicatedLog<E> {
    async fn submit(&self, command: Vec<u8>) -> ConsensusResult<()> {
        let command = Command::decode(&command)
            .map_err(|err| ConsensusError::FatalReplicaError(format!("undecodable command: {err}")))?;

        match self.raft.client_write(command).await {
            Ok(_) => Ok(()),
            Err(RaftError::APIError(ClientWriteError::ForwardToLeader(_))) => {
                Err(ConsensusError::NotLeader)
            }
            Err(RaftError::APIError(ClientWriteError::ChangeMembershipError(err))) => {
                Err(ConsensusError::TransientFailure(err.to_string()))
            }
            Err(err) => Err(ConsensusError::TransientFailure(err.to_string())),
        }
    }

    fn is_leader(&self) -> bool {
        self.raft.metrics().borrow().current_leader == Some(self.node_id)
    }
}
