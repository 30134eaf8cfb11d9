//! The poller: runs forever at `poll_interval`, indexing documents newer
//! than the last observed `timestamp_field` value (§4.5 "Poller").

use std::sync::Arc;

use futures::StreamExt;
use search_engine::SearchEngine;
use search_types::config::{IndexConfig, INTRINSIC_ID_SENTINEL};
use source_adapter::{SourceAdapter, Timestamp};
use sync_state::SyncStateStore;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::docid::resolve_doc_id;
use crate::options::PipelineOptions;
use crate::stop::{is_stopping, StopSignal};
use crate::write_path::{write_batch, BufferedDoc};

/// Runs the poll loop until `stop` fires. Each tick is independent: a
/// failed tick logs and is retried next interval from the same
/// `last_poll_time` (§5 "at-least-once semantics").
pub async fn run_poller(
    cfg: &IndexConfig,
    opts: &PipelineOptions,
    source: &Arc<dyn SourceAdapter>,
    engine: &Arc<SearchEngine>,
    sync_state: &Arc<SyncStateStore>,
    stop: &StopSignal,
) {
    let poll_interval = cfg.effective_poll_interval(opts.flush_interval_secs);
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(poll_interval));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let timestamp_field = resolve_effective_timestamp_field(cfg, source).await;

    if let Some(state) = sync_state.get(&cfg.source_collection.key()) {
        info!(index = %cfg.name, "resuming from {}", state.last_poll_time);
    }

    loop {
        ticker.tick().await;
        if is_stopping(stop) {
            info!(index = %cfg.name, "poller stopping");
            return;
        }
        if let Err(e) = run_one_tick(cfg, &timestamp_field, opts, source, engine, sync_state, stop).await {
            warn!(index = %cfg.name, error = %e, "poll tick failed, will retry from the same checkpoint next interval");
        }
    }
}

/// §4.2/§9: a configured `timestamp_field` that turns out not to exist on
/// the source collection is downgraded in memory to the intrinsic `_id`
/// sentinel rather than blocking the poller on an interactive prompt (that
/// bootstrap is `admin-cli init-timestamps`'s job, not this task's).
async fn resolve_effective_timestamp_field(cfg: &IndexConfig, source: &Arc<dyn SourceAdapter>) -> String {
    if cfg.timestamp_field == INTRINSIC_ID_SENTINEL {
        return cfg.timestamp_field.clone();
    }
    match source.has_field(&cfg.source_collection, &cfg.timestamp_field).await {
        Ok(true) => cfg.timestamp_field.clone(),
        Ok(false) => {
            warn!(
                index = %cfg.name,
                field = %cfg.timestamp_field,
                "configured timestamp_field missing from source collection, downgrading to _id ordering"
            );
            INTRINSIC_ID_SENTINEL.to_string()
        }
        Err(e) => {
            warn!(index = %cfg.name, error = %e, "could not verify timestamp_field, downgrading to _id ordering");
            INTRINSIC_ID_SENTINEL.to_string()
        }
    }
}

async fn run_one_tick(
    cfg: &IndexConfig,
    timestamp_field: &str,
    opts: &PipelineOptions,
    source: &Arc<dyn SourceAdapter>,
    engine: &Arc<SearchEngine>,
    sync_state: &Arc<SyncStateStore>,
    stop: &StopSignal,
) -> crate::Result<()> {
    let collection_key = cfg.source_collection.key();
    let last_poll_time = sync_state
        .get(&collection_key)
        .map(|s| s.last_poll_time)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);

    let mut stream = source.find_since(&cfg.source_collection, timestamp_field, last_poll_time, None).await?;

    let mut buffer: Vec<BufferedDoc> = Vec::with_capacity(opts.batch_size);
    let mut newest_observed: Option<Timestamp> = None;
    let mut observed_count: u64 = 0;

    while let Some(item) = stream.next().await {
        if is_stopping(stop) {
            break;
        }
        match item {
            Ok(doc) => {
                if let Some(ts) = doc.timestamp {
                    newest_observed = Some(newest_observed.map_or(ts, |current| current.max(ts)));
                }
                observed_count += 1;
                if let Some(id) = resolve_doc_id(&doc, &cfg.id_field) {
                    buffer.push((id, doc.document.fields));
                } else {
                    warn!(index = %cfg.name, "document missing id_field `{}`, skipping", cfg.id_field);
                }
            }
            Err(e) => warn!(index = %cfg.name, error = %e, "error reading document from source, skipping"),
        }

        if buffer.len() >= opts.batch_size {
            let written = write_batch(engine, &cfg.name, &buffer, opts.bulk_indexing);
            sync_state.increment_documents_indexed(&collection_key, &cfg.name, timestamp_field, &cfg.id_field, written);
            buffer.clear();
        }
    }
    if !buffer.is_empty() {
        let written = write_batch(engine, &cfg.name, &buffer, opts.bulk_indexing);
        sync_state.increment_documents_indexed(&collection_key, &cfg.name, timestamp_field, &cfg.id_field, written);
    }

    if let Some(newest) = newest_observed {
        sync_state.set_last_poll_time(&collection_key, &cfg.name, timestamp_field, &cfg.id_field, newest);
    }
    sync_state.set_last_sync_time(&collection_key, &cfg.name, timestamp_field, &cfg.id_field, OffsetDateTime::now_utc());

    if observed_count > 0 {
        info!(index = %cfg.name, documents = observed_count, "poll tick indexed documents");
    }
    Ok(())
}
