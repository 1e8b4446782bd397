//! The REPL/batch client: tokenizes `BEGIN`/`WRITE`/`READ`/`COMMIT`/`ABORT`/
//! `SHOW` commands and drives them over gRPC against a single shard node.

pub mod ast;
pub mod rusty;
pub mod session;
pub mod show;
pub mod stats;

pub use session::Session;
