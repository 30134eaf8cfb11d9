//! Background flush loop (§4.5 "Flush loop"): triggers an explicit sync
//! point on every shard at a fixed cadence, independent of per-write
//! commits, for engines whose durability story benefits from it.

use std::sync::Arc;

use search_engine::SearchEngine;
use tracing::warn;

use crate::stop::{is_stopping, StopSignal};

pub async fn run_flush_loop(engine: Arc<SearchEngine>, interval_secs: u64, stop: StopSignal) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
    loop {
        ticker.tick().await;
        if is_stopping(&stop) {
            return;
        }
        if let Err(e) = engine.flush() {
            warn!(error = %e, "flush loop failed to commit one or more shards");
        }
    }
}
