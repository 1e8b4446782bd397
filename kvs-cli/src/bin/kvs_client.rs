//! REPL/batch entrypoint: connects a `kvs-client::Session` to a single
//! shard node's `ShardService` address and either drives an interactive
//! prompt or consumes piped/`--query` input.

use std::io::{stdin, IsTerminal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use kvs_cli::config::ClientSettings;
use kvs_cli::trace;
use kvs_client::Session;

#[derive(Debug, Parser)]
#[command(author, version, about = "Distributed kv storage REPL client", disable_help_flag = true)]
struct Args {
    #[clap(long, help = "Print help information")]
    help: bool,

    #[clap(short = 'a', long = "addr", default_value = "127.0.0.1:7000", help = "Shard node address")]
    addr: String,

    #[clap(long = "quiet", short = 'q', default_value_t = false)]
    quiet: bool,

    #[clap(short = 'n', long, help = "Force non-interactive mode", default_value_t = false)]
    non_interactive: bool,

    #[clap(long, require_equals = true, help = "Query to execute")]
    query: Option<String>,

    #[clap(short = 'l', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if args.help {
        <Args as clap::CommandFactory>::command().print_help()?;
        return Ok(());
    }

    let log_dir = format!("{}/.kvs-client", std::env::var("HOME").unwrap_or_else(|_| ".".to_string()));
    let _guard = trace::init_logging(&log_dir, &args.log_level)?;
    info!(addr = %args.addr, "kvs-client starting");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("installing Ctrl-C handler")?;

    let settings = ClientSettings::load().unwrap_or_default();

    let is_terminal = stdin().is_terminal();
    let is_repl = is_terminal && !args.non_interactive && args.query.is_none();
    let show_stats = settings.show_stats && !args.quiet;

    let mut session = Session::connect(&args.addr, is_repl, show_stats, running).await.context("connecting to shard node")?;

    if is_repl {
        session.handle_repl().await;
        return Ok(());
    }

    match args.query {
        None => session.handle_reader(stdin().lock()).await?,
        Some(query) => session.handle_reader(std::io::Cursor::new(query)).await?,
    }

    Ok(())
}
