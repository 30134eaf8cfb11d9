//! Receives an Atlas-style `SearchRequest` and dispatches it to the
//! per-node [`search_engine::SearchEngine`] (§4.6 "Query Router (surface
//! area only)").
//!
//! The routing decision — direct read for a non-sharded index,
//! scatter-gather across local shards for a sharded one — is already
//! uniform inside `SearchEngine::search` (a single-shard
//! index is just a scatter-gather over one shard). This crate's job is to
//! know, per configured index, which case it is in (for logging and for
//! the day a richer implementation forwards sub-queries to peer nodes
//! over the reserved `JoinCluster`/`GetClusterState` cluster RPCs), and to
//! present the narrow facade the HTTP layer calls.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use search_engine::SearchEngine;
use search_types::config::IndexConfig;
use search_types::{SearchRequest, SearchResult};
use tracing::debug;

pub use search_engine::{Error, Result};

/// Whether a query against an index stayed local to one shard or fanned
/// out across several, purely informational (logged, not branched on).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision {
    Direct,
    ScatterGather { shard_count: u32 },
}

pub struct QueryRouter {
    engine: Arc<SearchEngine>,
    indexes: RwLock<HashMap<String, IndexConfig>>,
}

impl QueryRouter {
    pub fn new(engine: Arc<SearchEngine>) -> Self {
        QueryRouter { engine, indexes: RwLock::new(HashMap::new()) }
    }

    /// Registers `cfg` so subsequent searches against it can report their
    /// routing decision. Called alongside `SearchEngine::create_index`.
    pub fn register_index(&self, cfg: IndexConfig) {
        self.indexes.write().insert(cfg.name.clone(), cfg);
    }

    pub fn unregister_index(&self, name: &str) {
        self.indexes.write().remove(name);
    }

    /// §4.6: non-sharded indexes are served directly, sharded ones by
    /// local scatter-gather. Cross-node forwarding is out of scope here
    /// (§4.6 "Cross-node routing is NOT required").
    pub fn routing_decision(&self, index_name: &str) -> Option<RoutingDecision> {
        let guard = self.indexes.read();
        let cfg = guard.get(index_name)?;
        Some(if cfg.is_sharded() {
            RoutingDecision::ScatterGather { shard_count: cfg.distribution.shards }
        } else {
            RoutingDecision::Direct
        })
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        if let Some(decision) = self.routing_decision(&request.index) {
            debug!(index = %request.index, ?decision, "routing search request");
        }
        self.engine.search(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use search_types::config::{DistributionConfig, Mappings, SourceCollection};
    use tempfile::TempDir;

    fn cfg(name: &str, shards: u32) -> IndexConfig {
        IndexConfig {
            name: name.to_string(),
            source_collection: SourceCollection { database: "d".into(), collection: "c".into() },
            distribution: DistributionConfig { replicas: 1, shards },
            timestamp_field: "_id".into(),
            id_field: "_id".into(),
            poll_interval: None,
            mappings: Mappings::default(),
        }
    }

    #[test]
    fn non_sharded_index_routes_direct() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(SearchEngine::new(dir.path()));
        let router = QueryRouter::new(engine);
        router.register_index(cfg("single", 1));
        assert_eq!(router.routing_decision("single"), Some(RoutingDecision::Direct));
    }

    #[test]
    fn sharded_index_routes_scatter_gather() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(SearchEngine::new(dir.path()));
        let router = QueryRouter::new(engine);
        router.register_index(cfg("many", 4));
        assert_eq!(router.routing_decision("many"), Some(RoutingDecision::ScatterGather { shard_count: 4 }));
    }

    #[test]
    fn unknown_index_has_no_routing_decision() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(SearchEngine::new(dir.path()));
        let router = QueryRouter::new(engine);
        assert_eq!(router.routing_decision("missing"), None);
    }

    #[test]
    fn unregister_removes_the_routing_decision() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(SearchEngine::new(dir.path()));
        let router = QueryRouter::new(engine);
        router.register_index(cfg("single", 1));
        router.unregister_index("single");
        assert_eq!(router.routing_decision("single"), None);
    }
}
