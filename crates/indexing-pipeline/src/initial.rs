//! The initial indexer: `idle -> in_progress -> idle` (§4.5 "Initial
//! indexer"). Guarantees every document present when the process starts is
//! eventually indexed, independent of (and concurrent with) the poller.

use std::sync::Arc;

use futures::StreamExt;
use search_engine::SearchEngine;
use search_types::config::IndexConfig;
use search_types::SyncStatus;
use source_adapter::SourceAdapter;
use sync_state::SyncStateStore;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::docid::resolve_doc_id;
use crate::options::PipelineOptions;
use crate::stop::{is_stopping, StopSignal};
use crate::write_path::{write_batch, BufferedDoc};
use crate::Result;

/// Runs the initial pass once to completion (or until `stop` fires). Safe
/// to call again on restart: the engine's keyed writes make re-indexing
/// idempotent (§4.5 "Startup recovery").
pub async fn run_initial_indexing(
    cfg: &IndexConfig,
    opts: &PipelineOptions,
    source: &Arc<dyn SourceAdapter>,
    engine: &Arc<SearchEngine>,
    sync_state: &Arc<SyncStateStore>,
    stop: &StopSignal,
) -> Result<()> {
    let collection_key = cfg.source_collection.key();
    let mark = |status: SyncStatus| {
        sync_state.set_sync_status(&collection_key, &cfg.name, &cfg.timestamp_field, &cfg.id_field, status)
    };

    mark(SyncStatus::InProgress);
    sync_state.set_progress(&collection_key, &cfg.name, &cfg.timestamp_field, &cfg.id_field, "0%");

    match source.count(&cfg.source_collection, None).await {
        Ok(total) => {
            sync_state.set_total_documents(&collection_key, &cfg.name, &cfg.timestamp_field, &cfg.id_field, Some(total))
        }
        Err(e) => {
            warn!(index = %cfg.name, error = %e, "could not count source collection, progress will read not_available");
            sync_state.set_total_documents(&collection_key, &cfg.name, &cfg.timestamp_field, &cfg.id_field, None);
        }
    }

    let mut stream = source.find_all(&cfg.source_collection, None).await?;
    let mut buffer: Vec<BufferedDoc> = Vec::with_capacity(opts.batch_size);
    let mut total_written = 0u64;

    while let Some(item) = stream.next().await {
        if is_stopping(stop) {
            info!(index = %cfg.name, "initial indexer stopping mid-scan");
            return Ok(());
        }
        match item {
            Ok(doc) => {
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
            total_written += written;
            buffer.clear();
            sync_state.increment_documents_indexed(&collection_key, &cfg.name, &cfg.timestamp_field, &cfg.id_field, written);
        }
    }
    if !buffer.is_empty() {
        let written = write_batch(engine, &cfg.name, &buffer, opts.bulk_indexing);
        total_written += written;
        sync_state.increment_documents_indexed(&collection_key, &cfg.name, &cfg.timestamp_field, &cfg.id_field, written);
    }

    mark(SyncStatus::Idle);
    sync_state.set_progress(&collection_key, &cfg.name, &cfg.timestamp_field, &cfg.id_field, "100%");
    sync_state.set_last_sync_time(&collection_key, &cfg.name, &cfg.timestamp_field, &cfg.id_field, OffsetDateTime::now_utc());

    info!(index = %cfg.name, documents = total_written, "initial indexing complete");
    Ok(())
}
