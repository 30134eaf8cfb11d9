//! Shared application state handed to every route handler, wired together
//! once at startup (§2 control flow) and cloned cheaply (everything inside
//! is an `Arc`) per `actix-web` worker.

use std::collections::HashMap;
use std::sync::Arc;

use cluster::ClusterCoordinator;
use indexing_pipeline::StopSignal;
use query_router::QueryRouter;
use search_engine::SearchEngine;
use search_types::config::IndexConfig;
use sync_state::SyncStateStore;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub router: Arc<QueryRouter>,
    pub sync_state: Arc<SyncStateStore>,
    pub indexes: Arc<HashMap<String, IndexConfig>>,
    pub cluster: Option<Arc<ClusterCoordinator>>,
    pub stop: StopSignal,
}
