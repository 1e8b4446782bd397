/// Per-query timing/row-count stats, printed after a query in non-REPL mode.
#[derive(Clone, Debug, Default)]
pub struct ServerStats {
    pub rows_affected: i64,
    pub running_time_ms: f64,
}
