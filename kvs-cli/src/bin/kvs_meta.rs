//! Runs the MetaService: shard/peer routing (`kvs-router`) and the
//! `/2pc` coordinator endpoint (`kvs-coordinator`), merged into one `axum`
//! router and served on `META_PORT`.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use kvs_cli::config::MetaConfig;
use kvs_cli::trace;
use kvs_coordinator::TwoPhaseCommitCoordinator;
use kvs_router::MetaStore;

#[derive(Debug, Parser)]
#[command(author, version, about = "Runs the shard routing and 2PC coordinator service")]
struct Args {
    #[clap(short = 'c', long = "config", help = "Configuration file path")]
    config: Option<String>,

    #[clap(long, help = "HTTP listen port")]
    meta_port: Option<u16>,

    #[clap(long, help = "Directory holding peers.json/shards.json")]
    data_dir: Option<std::path::PathBuf>,

    #[clap(short = 'l', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_dir = format!("{}/.kvs-meta", std::env::var("HOME").unwrap_or_else(|_| ".".to_string()));
    let _guard = trace::init_logging(&log_dir, &args.log_level)?;

    let mut cfg = MetaConfig::load(args.config.as_deref()).context("loading meta config")?;
    if let Some(port) = args.meta_port {
        cfg.meta_port = port;
    }
    if let Some(dir) = args.data_dir {
        cfg.data_dir = dir;
    }
    cfg.apply_env();

    let meta = Arc::new(MetaStore::open(&cfg.data_dir).context("opening meta store")?);
    let coordinator = Arc::new(TwoPhaseCommitCoordinator::new(meta.clone()));

    let app = kvs_router::http::router(meta).merge(kvs_coordinator::http::router(coordinator));

    let addr: std::net::SocketAddr = format!("0.0.0.0:{}", cfg.meta_port).parse()?;
    info!(%addr, "meta service listening");
    let listener = tokio::net::TcpListener::bind(addr).await.context("binding meta_port")?;
    axum::serve(listener, app).await.context("meta service exited")?;

    Ok(())
}
