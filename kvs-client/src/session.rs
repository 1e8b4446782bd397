use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use rustyline::config::Builder;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Editor};
use tokio::time::Instant;
use tonic::transport::Channel;

use kvs_node::proto::shard_service_client::ShardServiceClient;
use kvs_node::proto::{AbortRequest, BeginTransactionRequest, CommitRequest, ReadRequest, WriteRequest};

use crate::ast::token_kind::TokenKind;
use crate::ast::tokenizer::{Token, Tokenizer};
use crate::rusty::CliHelper;
use crate::show::Show;
use crate::stats::ServerStats;

const DEFAULT_PROMPT: &str = "kvsql";

/// Drives a `ShardService` client from parsed `BEGIN`/`WRITE`/`READ`/
/// `COMMIT`/`ABORT` commands -- the REPL owns the connection, a
/// last-begun tx-id for convenience, and whether to print per-query stats.
pub struct Session {
    is_repl: bool,
    show_stats: bool,
    running: Arc<AtomicBool>,

    client: ShardServiceClient<Channel>,
    last_tx_id: Option<String>,

    keywords: Arc<Vec<String>>,
}

impl Session {
    pub async fn connect(address: &str, is_repl: bool, show_stats: bool, running: Arc<AtomicBool>) -> Result<Self> {
        if is_repl {
            println!("Welcome to {DEFAULT_PROMPT}.");
            println!("Connecting to {address}.");
            println!();
        }

        let endpoint = format!("http://{address}");
        let client = ShardServiceClient::connect(endpoint).await?;

        Ok(Self {
            is_repl,
            show_stats,
            running,
            client,
            last_tx_id: None,
            keywords: Arc::new(
                ["begin", "write", "read", "commit", "abort", "show"].iter().map(|s| s.to_string()).collect(),
            ),
        })
    }

    fn prompt(&self) -> String {
        format!("{DEFAULT_PROMPT} > ")
    }

    pub async fn handle_repl(&mut self) {
        let config = Builder::new().completion_prompt_limit(5).completion_type(CompletionType::Circular).build();
        let mut rl = Editor::<CliHelper, DefaultHistory>::with_config(config).unwrap();
        rl.set_helper(Some(CliHelper::with_keywords(self.keywords.clone())));
        rl.load_history(&history_path()).ok();

        loop {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            match rl.readline(&self.prompt()) {
                Ok(line) => {
                    let _ = rl.add_history_entry(&line);
                    match self.handle_query(true, &line).await {
                        Ok(None) => break,
                        Ok(Some(_)) => {}
                        Err(err) => eprintln!("error: {err}"),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    self.running.store(false, Ordering::SeqCst);
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => eprintln!("io err: {err}"),
            }
        }

        println!("Bye~");
        let _ = rl.save_history(&history_path());
    }

    pub async fn handle_reader<R: BufRead>(&mut self, reader: R) -> Result<()> {
        let start = Instant::now();
        for line in reader.lines() {
            let line = line.map_err(|err| anyhow!("read line: {err}"))?;
            if !line.trim().is_empty() {
                self.handle_query(false, &line).await?;
            }
        }
        println!("{:.3}", start.elapsed().as_secs_f64());
        Ok(())
    }

    async fn handle_query(&mut self, is_repl: bool, query: &str) -> Result<Option<ServerStats>> {
        let query = query.trim_end_matches(';').trim();
        if is_repl && (query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit")) {
            return Ok(None);
        }
        if query.is_empty() {
            return Ok(Some(ServerStats::default()));
        }

        let tokens: Vec<Token> =
            Tokenizer::new(query).collect::<std::result::Result<Vec<_>, String>>().map_err(|err| anyhow!(err))?;
        let tokens: Vec<Token> = tokens.into_iter().filter(|t| t.kind != TokenKind::EOI).collect();
        if tokens.is_empty() {
            return Ok(Some(ServerStats::default()));
        }

        let start = Instant::now();
        let stats = self.dispatch(is_repl, &tokens, start).await?;
        Ok(Some(stats))
    }

    async fn dispatch(&mut self, is_repl: bool, tokens: &[Token<'_>], start: Instant) -> Result<ServerStats> {
        let show = Show::new_with_start(self.show_stats, is_repl, start);

        match tokens[0].kind {
            TokenKind::BEGIN => {
                let resp = self.client.begin_transaction(BeginTransactionRequest {}).await?.into_inner();
                self.last_tx_id = Some(resp.tx_id.clone());
                if is_repl {
                    eprintln!("tx_id: {}", resp.tx_id);
                }
                show.output(0);
                Ok(ServerStats::default())
            }
            TokenKind::WRITE => {
                if tokens.len() < 3 {
                    return Err(anyhow!("WRITE requires a key and a value"));
                }
                let key = tokens[1].unquoted().as_bytes().to_vec();
                let value = tokens[2].unquoted().as_bytes().to_vec();
                let tx_id = self.resolve_tx_id(tokens.get(3))?;

                let resp = self.client.write(WriteRequest { key, value, tx_id }).await?.into_inner();
                report_outcome(is_repl, resp.success, &resp.message);
                show.output(1);
                Ok(ServerStats { rows_affected: resp.success as i64, ..Default::default() })
            }
            TokenKind::READ => {
                if tokens.len() < 2 {
                    return Err(anyhow!("READ requires a key"));
                }
                let key = tokens[1].unquoted().as_bytes().to_vec();
                let read_timestamp = tokens.get(2).map(|t| t.unquoted().to_string()).unwrap_or_default();

                let resp = self.client.read(ReadRequest { key, read_timestamp }).await?.into_inner();
                if is_repl {
                    if resp.value.is_empty() {
                        eprintln!("N/A ~");
                    } else {
                        eprintln!("{}", String::from_utf8_lossy(&resp.value));
                    }
                }
                show.output(1);
                Ok(ServerStats::default())
            }
            TokenKind::COMMIT => {
                let tx_id = self.resolve_tx_id(tokens.get(1))?;
                let resp = self.client.commit(CommitRequest { tx_id }).await?.into_inner();
                report_outcome(is_repl, resp.success, &resp.message);
                show.output(1);
                Ok(ServerStats { rows_affected: resp.success as i64, ..Default::default() })
            }
            TokenKind::ABORT => {
                let tx_id = self.resolve_tx_id(tokens.get(1))?;
                let resp = self.client.abort(AbortRequest { tx_id }).await?.into_inner();
                report_outcome(is_repl, resp.success, &resp.message);
                show.output(1);
                Ok(ServerStats { rows_affected: resp.success as i64, ..Default::default() })
            }
            TokenKind::SHOW => {
                if is_repl {
                    let now: DateTime<Local> = Local::now();
                    eprintln!("now: {}", now.format("%Y-%m-%d %H:%M:%S%.3f"));
                    eprintln!("last tx_id: {}", self.last_tx_id.as_deref().unwrap_or("<none>"));
                }
                show.output(0);
                Ok(ServerStats::default())
            }
            _ => Err(anyhow!("unrecognized command: {}", tokens[0].text())),
        }
    }

    /// Uses an explicit tx-id token if given, otherwise falls back to the
    /// most recently begun transaction -- convenience for the REPL only.
    fn resolve_tx_id(&self, token: Option<&Token<'_>>) -> Result<String> {
        if let Some(token) = token {
            return Ok(token.unquoted().to_string());
        }
        self.last_tx_id.clone().ok_or_else(|| anyhow!("no tx_id given and no transaction begun yet"))
    }
}

fn report_outcome(is_repl: bool, success: bool, message: &str) {
    if !is_repl {
        return;
    }
    if success {
        eprintln!("OK ~");
    } else {
        eprintln!("{message}");
    }
}

fn history_path() -> String {
    format!("{}/.kvsql_history", std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
}
