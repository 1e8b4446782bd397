//! Runs one shard replica: a `ShardService` gRPC listener for clients and an
//! `axum` HTTP listener for openraft's internal AppendEntries/Vote/
//! InstallSnapshot traffic between replicas of the same shard.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use openraft::{BasicNode, Config};
use tracing::info;

use kvs_cli::config::NodeConfig;
use kvs_cli::trace;
use kvs_consensus::raft::LogStore;
use kvs_consensus::{CommandFsm, RaftReplicatedLog, ReplicatedLog};
use kvs_hlc::Clock;
use kvs_node::proto::shard_service_server::ShardServiceServer;
use kvs_node::{HttpRaftNetworkFactory, ShardGrpcService, ShardNode};
use kvs_store::storage::log_cask::LogCask;
use kvs_store::VersionedStore;

#[derive(Debug, Parser)]
#[command(author, version, about = "Runs a single shard replica")]
struct Args {
    #[clap(short = 'c', long = "config", help = "Configuration file path")]
    config: Option<String>,

    #[clap(long, help = "This replica's raft node id")]
    node_id: Option<u64>,

    #[clap(long, help = "Client-facing ShardService listen address")]
    shard_addr: Option<String>,

    #[clap(long, help = "Internal raft network listen address")]
    raft_addr: Option<String>,

    #[clap(long, help = "Storage engine directory")]
    db_path: Option<std::path::PathBuf>,

    #[clap(short = 'l', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_dir = format!("{}/.kvs-node", std::env::var("HOME").unwrap_or_else(|_| ".".to_string()));
    let _guard = trace::init_logging(&log_dir, &args.log_level)?;

    let mut cfg = NodeConfig::load(args.config.as_deref()).context("loading node config")?;
    if let Some(node_id) = args.node_id {
        cfg.node_id = node_id;
    }
    if let Some(addr) = args.shard_addr {
        cfg.shard_addr = addr;
    }
    if let Some(addr) = args.raft_addr {
        cfg.raft_addr = addr;
    }
    if let Some(path) = args.db_path {
        cfg.db_path = path;
    }
    cfg.apply_env();

    info!(node_id = cfg.node_id, shard_addr = %cfg.shard_addr, raft_addr = %cfg.raft_addr, "starting shard node");

    let engine = LogCask::new(cfg.db_path.clone()).context("opening storage engine")?;
    let store = VersionedStore::new(engine);
    let fsm = Arc::new(CommandFsm::new(store.clone()));

    let mut voters = BTreeMap::new();
    voters.insert(cfg.node_id, BasicNode::new(cfg.raft_addr.clone()));
    for peer in &cfg.peers {
        voters.insert(peer.node_id, BasicNode::new(peer.raft_addr.clone()));
    }

    let log_store = LogStore::new();
    let network = HttpRaftNetworkFactory::new();
    let raft_config =
        Arc::new(Config::default().validate().context("validating raft config")?);

    let replicated_log =
        RaftReplicatedLog::new(cfg.node_id, raft_config, network, log_store, fsm, voters)
            .await
            .context("bringing up raft group")?;
    let raft_handle = replicated_log.raft().clone();

    let node = Arc::new(ShardNode::new(store, Arc::new(replicated_log) as Arc<dyn ReplicatedLog>, Clock::new()));

    let raft_addr: std::net::SocketAddr = cfg.raft_addr.parse().context("parsing raft_addr")?;
    let raft_router = kvs_node::raft_network::router(raft_handle);
    let raft_server = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(raft_addr).await.expect("bind raft_addr");
        axum::serve(listener, raft_router).await.expect("raft network server exited");
    });

    let shard_addr: std::net::SocketAddr = cfg.shard_addr.parse().context("parsing shard_addr")?;
    info!(%shard_addr, "shard service listening");
    tonic::transport::Server::builder()
        .add_service(ShardServiceServer::new(ShardGrpcService::new(node)))
        .serve(shard_addr)
        .await
        .context("shard grpc server exited")?;

    raft_server.abort();
    Ok(())
}
