//! Bounded exponential backoff for the one retry loop the coordinator
//! protocol requires: a Commit that fails after another participant's
//! Commit has already succeeded must keep being retried, never aborted.

use std::time::Duration;

use exponential_backoff::Backoff;

#[derive(Debug, Clone)]
pub struct CommitRetry {
    attempt: u32,
    backoff: Backoff,
}

impl CommitRetry {
    pub fn new() -> Self {
        Self {
            attempt: 0,
            backoff: Backoff::new(u32::MAX, Duration::from_millis(100), Some(Duration::from_secs(30))),
        }
    }

    /// Always returns `Some`: the retry is unbounded by protocol
    /// requirement (`max_retries = u32::MAX`), so this never signals give-up.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt += 1;
        self.backoff.next(self.attempt).unwrap_or(Duration::from_secs(30))
    }
}

impl Default for CommitRetry {
    fn default() -> Self {
        Self::new()
    }
}
