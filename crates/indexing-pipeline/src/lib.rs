//! Bridges `source-adapter`, `sync-state` and `search-engine`: for every
//! configured index, guarantees the documents present at startup are
//! eventually indexed ("initial indexing") and that new or updated
//! documents are indexed with bounded lag thereafter ("polling") (§4.5).
//!
//! Two tasks run per index (initial indexer, poller), plus one shared
//! flush-loop task. All three are preemptable between batches/ticks by a
//! single stop channel shared across every index on the node (§5).

pub mod docid;
pub mod error;
mod flush;
mod initial;
mod options;
mod poller;
mod stop;
mod write_path;

use std::sync::Arc;

use search_engine::SearchEngine;
use search_types::config::IndexConfig;
use source_adapter::SourceAdapter;
use sync_state::SyncStateStore;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub use error::{Error, Result};
pub use options::PipelineOptions;
pub use stop::{is_stopping, new_stop_channel, StopSignal};

/// The two long-running tasks spawned for one configured index.
pub struct IndexTasks {
    pub initial: JoinHandle<()>,
    pub poller: JoinHandle<()>,
}

/// Spawns the initial indexer and the poller for `cfg`. The initial
/// indexer always runs (even on restart with an existing checkpoint): the
/// engine's keyed writes make re-scanning the full collection idempotent
/// (§4.5 "Startup recovery" default behavior).
pub fn spawn_index_tasks(
    cfg: IndexConfig,
    opts: PipelineOptions,
    source: Arc<dyn SourceAdapter>,
    engine: Arc<SearchEngine>,
    sync_state: Arc<SyncStateStore>,
    stop: StopSignal,
) -> IndexTasks {
    let initial = {
        let cfg = cfg.clone();
        let opts = opts;
        let source = source.clone();
        let engine = engine.clone();
        let sync_state = sync_state.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            if let Err(e) = initial::run_initial_indexing(&cfg, &opts, &source, &engine, &sync_state, &stop).await {
                error!(index = %cfg.name, error = %e, "initial indexing pass ended with an error");
            }
        })
    };

    let poller = {
        let cfg = cfg.clone();
        let source = source.clone();
        let engine = engine.clone();
        let sync_state = sync_state.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            poller::run_poller(&cfg, &opts, &source, &engine, &sync_state, &stop).await;
        })
    };

    info!(index = %cfg.name, "indexing pipeline started");
    IndexTasks { initial, poller }
}

/// Spawns the single flush-loop task shared by every index on this node.
pub fn spawn_flush_loop(engine: Arc<SearchEngine>, flush_interval_secs: u64, stop: StopSignal) -> JoinHandle<()> {
    tokio::spawn(flush::run_flush_loop(engine, flush_interval_secs, stop))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream::{self, BoxStream};
    use search_types::config::{DistributionConfig, Mappings, SourceCollection};
    use search_types::Document;
    use source_adapter::{SourceDocument, Timestamp};
    use sync_state::SyncStateStore;
    use tempfile::TempDir;

    struct FixedAdapter {
        docs: Vec<serde_json::Map<String, serde_json::Value>>,
    }

    #[async_trait]
    impl SourceAdapter for FixedAdapter {
        async fn find_all(
            &self,
            _collection: &SourceCollection,
            _limit: Option<u64>,
        ) -> source_adapter::Result<BoxStream<'_, source_adapter::Result<SourceDocument>>> {
            let items: Vec<source_adapter::Result<SourceDocument>> = self
                .docs
                .iter()
                .enumerate()
                .map(|(i, fields)| {
                    Ok(SourceDocument { document: Document::new(format!("d{i}"), fields.clone()), timestamp: None })
                })
                .collect();
            Ok(stream::iter(items).boxed())
        }

        async fn find_since(
            &self,
            _collection: &SourceCollection,
            _timestamp_field: &str,
            _since: Timestamp,
            _limit: Option<u64>,
        ) -> source_adapter::Result<BoxStream<'_, source_adapter::Result<SourceDocument>>> {
            Ok(stream::iter(Vec::<source_adapter::Result<SourceDocument>>::new()).boxed())
        }

        async fn max_timestamp(&self, _collection: &SourceCollection, _timestamp_field: &str) -> source_adapter::Result<Timestamp> {
            Ok(Timestamp::UNIX_EPOCH)
        }

        async fn count(&self, _collection: &SourceCollection, _filter: Option<serde_json::Value>) -> source_adapter::Result<u64> {
            Ok(self.docs.len() as u64)
        }

        async fn has_field(&self, _collection: &SourceCollection, _field: &str) -> source_adapter::Result<bool> {
            Ok(true)
        }

        async fn backfill_field(&self, _collection: &SourceCollection, _field: &str, _value: Timestamp) -> source_adapter::Result<u64> {
            Ok(0)
        }
    }

    fn test_cfg() -> IndexConfig {
        IndexConfig {
            name: "widgets".to_string(),
            source_collection: SourceCollection { database: "d".into(), collection: "c".into() },
            distribution: DistributionConfig::default(),
            timestamp_field: "_id".into(),
            id_field: "_id".into(),
            poll_interval: Some(3600),
            mappings: Mappings::default(),
        }
    }

    #[tokio::test]
    async fn initial_indexing_runs_to_completion_and_reports_progress() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(SearchEngine::new(dir.path().join("index")));
        let cfg = test_cfg();
        engine.create_index(&cfg).unwrap();

        let sync_state = Arc::new(SyncStateStore::load(dir.path().join("sync.json")).unwrap());
        let source: Arc<dyn SourceAdapter> =
            Arc::new(FixedAdapter { docs: vec![serde_json::Map::new(), serde_json::Map::new()] });
        let (_tx, stop) = new_stop_channel();

        initial::run_initial_indexing(&cfg, &PipelineOptions::default(), &source, &engine, &sync_state, &stop)
            .await
            .unwrap();

        let state = sync_state.get(&cfg.source_collection.key()).unwrap();
        assert_eq!(state.progress, "100%");
        assert_eq!(state.documents_indexed, 2);
        assert_eq!(state.sync_status, search_types::SyncStatus::Idle);
    }

    #[test]
    fn stop_channel_reflects_sender_flip() {
        let (tx, rx) = new_stop_channel();
        assert!(!is_stopping(&rx));
        tx.send(true).unwrap();
        assert!(is_stopping(&rx));
    }
}
