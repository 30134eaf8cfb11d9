pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;

use std::collections::HashMap;
use std::sync::Arc;

use cluster::ClusterCoordinator;
use config::AppConfig;
use indexing_pipeline::{IndexTasks, StopSignal};
use query_router::QueryRouter;
use search_engine::SearchEngine;
use source_adapter::{MongoSourceAdapter, SourceAdapter};
use state::AppState;
use sync_state::SyncStateStore;
use tracing::info;

/// Everything started during wiring that needs a matching step during
/// shutdown (§2).
pub struct Running {
    pub state: AppState,
    pub index_tasks: Vec<IndexTasks>,
    pub flush_task: tokio::task::JoinHandle<()>,
    pub stop_tx: tokio::sync::watch::Sender<bool>,
}

/// Builds every long-lived component and starts the background tasks, in
/// the dependency order §2 lays out: source adapter, then sync state,
/// then search engine, then (optionally) cluster, then the indexing
/// pipeline, then the query router that fronts it all.
pub async fn wire(cfg: &AppConfig) -> anyhow::Result<Running> {
    let mongo_uri = config::mongo_uri(&cfg.mongodb);
    let source: Arc<dyn SourceAdapter> = Arc::new(MongoSourceAdapter::connect(&mongo_uri).await?);

    if let Some(parent) = cfg.search.sync_state_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let sync_state = Arc::new(SyncStateStore::load(cfg.search.sync_state_path.clone())?);

    std::fs::create_dir_all(&cfg.search.index_path)?;
    let engine = Arc::new(SearchEngine::new(cfg.search.index_path.clone()));
    engine.cleanup(&cfg.indexes)?;
    for index_cfg in &cfg.indexes {
        engine.create_index(index_cfg)?;
    }

    let cluster = if cfg.cluster.enabled {
        let coordinator =
            Arc::new(ClusterCoordinator::start(cfg.cluster.node_id, cfg.cluster.rpc_addr(), cfg.cluster.data_dir.clone()).await?);
        if cfg.cluster.bootstrap {
            coordinator.bootstrap(cfg.cluster.rpc_addr()).await?;
        }
        cluster::spawn_leadership_ticker(coordinator.clone()).await;
        Some(coordinator)
    } else {
        None
    };

    let router = Arc::new(QueryRouter::new(engine.clone()));
    let mut indexes = HashMap::new();
    for index_cfg in &cfg.indexes {
        router.register_index(index_cfg.clone());
        indexes.insert(index_cfg.name.clone(), index_cfg.clone());
    }

    let (stop_tx, stop_rx): (_, StopSignal) = indexing_pipeline::new_stop_channel();
    let opts = cfg.search.pipeline_options();

    let mut index_tasks = Vec::with_capacity(cfg.indexes.len());
    for index_cfg in &cfg.indexes {
        index_tasks.push(indexing_pipeline::spawn_index_tasks(
            index_cfg.clone(),
            opts,
            source.clone(),
            engine.clone(),
            sync_state.clone(),
            stop_rx.clone(),
        ));
    }
    let flush_task = indexing_pipeline::spawn_flush_loop(engine.clone(), opts.flush_interval_secs, stop_rx.clone());
    sync_state::spawn_background_save(sync_state.clone());

    info!(indexes = cfg.indexes.len(), cluster = cfg.cluster.enabled, "node wired up");

    Ok(Running {
        state: AppState { engine, router, sync_state, indexes: Arc::new(indexes), cluster, stop: stop_rx },
        index_tasks,
        flush_task,
        stop_tx,
    })
}

/// Runs the graceful shutdown sequence (§2): stop accepting new work is
/// the caller's job (dropping the HTTP server handle before calling this);
/// from there we cancel the pipeline, flush and persist sync state, close
/// the engine, and step down from the cluster, in that order.
pub async fn shutdown(running: Running) {
    info!("shutting down");
    let _ = running.stop_tx.send(true);
    for tasks in running.index_tasks {
        let _ = tasks.initial.await;
        let _ = tasks.poller.await;
    }
    let _ = running.flush_task.await;

    if let Err(e) = running.state.engine.flush() {
        tracing::warn!(error = %e, "flush during shutdown failed");
    }
    sync_state::save_on_shutdown(&running.state.sync_state);

    if let Err(e) = running.state.engine.close() {
        tracing::warn!(error = %e, "engine close during shutdown failed");
    }

    if let Some(coordinator) = running.state.cluster {
        if coordinator.is_leader() {
            info!("stepping down as leader before shutdown");
        }
        if let Err(e) = coordinator.remove_voter(coordinator.node_id).await {
            tracing::warn!(error = %e, "failed to remove self as a voter during shutdown");
        }
    }
    info!("shutdown complete");
}
