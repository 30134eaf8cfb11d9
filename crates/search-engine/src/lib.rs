//! Per-node shard lifecycle and query execution on a single node (§4.3).
//!
//! A single reader-writer lock guards the logical-index -> shard map.
//! Individual shards support safe concurrent reads and writes themselves
//! (delegated to tantivy); sync-time bookkeeping lives in `crates/sync-state`
//! behind its own lock, independent of this one, to avoid contention
//! between index mutation and progress reporting.

pub mod error;
pub mod query;
pub mod routing;
pub mod schema;
mod shard;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use rayon::prelude::*;
use search_types::config::IndexConfig;
use search_types::shard::physical_shard_name;
use search_types::{FacetRequest, Query, SearchRequest, SearchResult};
use serde_json::{Map, Value};
use tracing::{info, warn};

pub use error::{Error, Result};
pub use shard::ShardHandle;

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatus {
    pub name: String,
    pub doc_count: u64,
    pub status: String,
}

/// The per-node facade over every shard this node hosts.
pub struct SearchEngine {
    data_dir: PathBuf,
    // Logical index name -> its shards, ordered by shard ordinal.
    indexes: RwLock<HashMap<String, Vec<Arc<ShardHandle>>>>,
}

impl SearchEngine {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        SearchEngine { data_dir: data_dir.into(), indexes: RwLock::new(HashMap::new()) }
    }

    /// Creates or opens the shard(s) for `cfg`. Idempotent: re-creating an
    /// already-open index is a no-op (§4.3).
    pub fn create_index(&self, cfg: &IndexConfig) -> Result<()> {
        if self.indexes.read().contains_key(&cfg.name) {
            return Ok(());
        }

        let shard_count = cfg.distribution.shards.max(1);
        let mut shards = Vec::with_capacity(shard_count as usize);
        for ordinal in 0..shard_count {
            let physical_name = physical_shard_name(&cfg.name, ordinal, shard_count);
            let path = self.data_dir.join(&physical_name);
            let handle = ShardHandle::open(physical_name, path, &cfg.mappings)?;
            shards.push(Arc::new(handle));
        }

        info!(index = %cfg.name, shards = shard_count, "opened index");
        self.indexes.write().insert(cfg.name.clone(), shards);
        Ok(())
    }

    /// Closes and deletes every shard belonging to `name` (§4.3).
    pub fn remove_index(&self, name: &str) -> Result<()> {
        let shards = self.indexes.write().remove(name);
        if let Some(shards) = shards {
            for shard in shards {
                shard.close()?;
                let path = self.data_dir.join(&shard.physical_name);
                ShardHandle::delete_directory(&path)?;
            }
        }
        Ok(())
    }

    /// Destroys every on-disk shard directory not referenced by
    /// `configured_set` (§4.3, called at startup).
    pub fn cleanup(&self, configured_set: &[IndexConfig]) -> Result<()> {
        let expected: std::collections::HashSet<String> = configured_set
            .iter()
            .flat_map(|cfg| {
                let shard_count = cfg.distribution.shards.max(1);
                (0..shard_count).map(move |o| physical_shard_name(&cfg.name, o, shard_count))
            })
            .collect();

        if !self.data_dir.exists() {
            return Ok(());
        }
        for entry in std::fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !expected.contains(&name) {
                warn!(shard = %name, "removing unconfigured shard directory");
                std::fs::remove_dir_all(entry.path())?;
            }
        }
        Ok(())
    }

    /// One entry per logical index, doc counts summed across its physical
    /// shards. Physical shard names never leak past this boundary (§6).
    pub fn list_indexes(&self) -> Vec<IndexStatus> {
        self.indexes
            .read()
            .iter()
            .map(|(name, shards)| IndexStatus {
                name: name.clone(),
                doc_count: shards.iter().map(|s| s.doc_count()).sum(),
                status: "open".to_string(),
            })
            .collect()
    }

    /// Live document count for a single logical index, summed across its
    /// physical shards (§6 `docCount`). `None` if the index isn't open.
    pub fn doc_count(&self, index_name: &str) -> Option<u64> {
        self.indexes.read().get(index_name).map(|shards| shards.iter().map(|s| s.doc_count()).sum())
    }

    pub fn close(&self) -> Result<()> {
        for shards in self.indexes.write().values() {
            for shard in shards {
                shard.close()?;
            }
        }
        Ok(())
    }

    /// Commits every open shard. `index_one`/`index_batch` already commit
    /// per call, so this mostly matters for engines that batch commits
    /// internally; the flush loop calls it on a fixed cadence regardless
    /// (§4.5 "Flush loop").
    pub fn flush(&self) -> Result<()> {
        for shards in self.indexes.read().values() {
            for shard in shards {
                shard.commit()?;
            }
        }
        Ok(())
    }

    /// Routes `doc_id` via FNV-1a-32 modulo shard count when sharded, else
    /// the single shard, and writes it durably (§4.3 `index_one`).
    pub fn index_one(&self, index_name: &str, doc_id: &str, fields: &Map<String, Value>) -> Result<()> {
        let shard = self.shard_for_doc(index_name, doc_id)?;
        shard.index_one(doc_id, fields)
    }

    /// Batched write to a single, already-routed physical shard (§4.3
    /// `index_batch`), used by the bulk indexing path.
    pub fn index_batch(&self, physical_shard_name: &str, docs: &[(String, Map<String, Value>)]) -> Result<()> {
        let shard = self.find_physical_shard(physical_shard_name)?;
        shard.index_batch(docs)
    }

    pub fn delete(&self, index_name: &str, doc_id: &str) -> Result<()> {
        let shard = self.shard_for_doc(index_name, doc_id)?;
        shard.delete(doc_id)
    }

    /// Resolves the physical shard `doc_id` routes to within `index_name`.
    /// Exposed so the indexing pipeline can group documents by physical
    /// shard before calling [`Self::index_batch`].
    pub fn physical_shard_for_doc(&self, index_name: &str, doc_id: &str) -> Result<String> {
        Ok(self.shard_for_doc(index_name, doc_id)?.physical_name.clone())
    }

    fn shard_for_doc(&self, index_name: &str, doc_id: &str) -> Result<Arc<ShardHandle>> {
        let guard = self.indexes.read();
        let shards = guard
            .get(index_name)
            .ok_or_else(|| Error::IndexNotFound(index_name.to_string()))?;
        let ordinal = routing::shard_for_doc_id(doc_id, shards.len() as u32) as usize;
        Ok(shards[ordinal].clone())
    }

    fn find_physical_shard(&self, physical_name: &str) -> Result<Arc<ShardHandle>> {
        let guard = self.indexes.read();
        guard
            .values()
            .flatten()
            .find(|s| s.physical_name == physical_name)
            .cloned()
            .ok_or_else(|| Error::IndexNotFound(physical_name.to_string()))
    }

    /// Executes `request` (§4.3 `search`). Single-shard indexes query
    /// directly; sharded indexes scatter-gather across all shards in
    /// parallel, merge hits by descending score, sum facets and totals,
    /// and slice the window after merging.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        let (from, size) = request
            .validate()
            .map_err(|e| Error::InvalidQuery(e.to_string()))?;
        let query = Query::parse(&request.query).map_err(|e| Error::InvalidQuery(e.to_string()))?;

        let shards = {
            let guard = self.indexes.read();
            guard
                .get(&request.index)
                .ok_or_else(|| Error::IndexNotFound(request.index.clone()))?
                .clone()
        };

        let window = from + size;
        let results: Vec<(String, Result<SearchResult>)> = shards
            .par_iter()
            .map(|shard| {
                (
                    shard.physical_name.clone(),
                    shard.search_local(&query, &request.facets, &request.highlight, window),
                )
            })
            .collect();

        Ok(merge_shard_results(results, from, size, &request.facets))
    }
}

fn merge_shard_results(
    results: Vec<(String, Result<SearchResult>)>,
    from: usize,
    size: usize,
    facet_requests: &[FacetRequest],
) -> SearchResult {
    let mut merged = SearchResult::empty();
    let mut failed_shards = Vec::new();

    for (shard_name, result) in results {
        match result {
            Ok(partial) => {
                merged.total += partial.total;
                merged.max_score = merged.max_score.max(partial.max_score);
                merged.hits.extend(partial.hits);
                if let Some(facets) = partial.facets {
                    merged.facets = Some(match merged.facets.take() {
                        None => facets,
                        Some(existing) => merge_facet_maps(existing, facets),
                    });
                }
            }
            Err(e) => {
                warn!(shard = %shard_name, error = %e, "shard-level search failure, dropping its contribution");
                failed_shards.push(shard_name);
            }
        }
    }

    merged.hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    merged.hits = merged.hits.into_iter().skip(from).take(size).collect();
    merged.partial = !failed_shards.is_empty();
    merged.failed_shards = failed_shards;

    if facet_requests.is_empty() {
        merged.facets = None;
    }
    merged
}

fn merge_facet_maps(
    mut a: HashMap<String, search_types::FacetResult>,
    b: HashMap<String, search_types::FacetResult>,
) -> HashMap<String, search_types::FacetResult> {
    for (name, result) in b {
        a.entry(name)
            .and_modify(|existing| *existing = std::mem::take(existing).merge(result.clone()))
            .or_insert(result);
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use search_types::FacetBucket;

    fn facet_result(pairs: &[(&str, u64)]) -> search_types::FacetResult {
        search_types::FacetResult {
            buckets: pairs.iter().map(|(v, c)| FacetBucket { value: v.to_string(), count: *c }).collect(),
        }
    }

    #[test]
    fn merge_sums_totals_and_takes_max_score() {
        let a = SearchResult { total: 3, max_score: 1.5, ..SearchResult::empty() };
        let b = SearchResult { total: 2, max_score: 2.5, ..SearchResult::empty() };
        let merged = merge_shard_results(
            vec![("s0".into(), Ok(a)), ("s1".into(), Ok(b))],
            0,
            10,
            &[],
        );
        assert_eq!(merged.total, 5);
        assert_eq!(merged.max_score, 2.5);
        assert!(!merged.partial);
    }

    #[test]
    fn merge_marks_partial_on_shard_failure() {
        let a = SearchResult { total: 1, ..SearchResult::empty() };
        let merged = merge_shard_results(
            vec![("s0".into(), Ok(a)), ("s1".into(), Err(Error::IndexNotFound("x".into())))],
            0,
            10,
            &[],
        );
        assert!(merged.partial);
        assert_eq!(merged.failed_shards, vec!["s1".to_string()]);
    }

    #[test]
    fn merge_sums_facets_additively_across_shards() {
        let mut facets_a = HashMap::new();
        facets_a.insert("color".to_string(), facet_result(&[("red", 2)]));
        let mut facets_b = HashMap::new();
        facets_b.insert("color".to_string(), facet_result(&[("red", 1), ("blue", 4)]));

        let a = SearchResult { facets: Some(facets_a), ..SearchResult::empty() };
        let b = SearchResult { facets: Some(facets_b), ..SearchResult::empty() };
        let merged = merge_shard_results(
            vec![("s0".into(), Ok(a)), ("s1".into(), Ok(b))],
            0,
            10,
            &[FacetRequest { name: "color".into(), path: "color".into(), kind: Default::default() }],
        );
        let color = &merged.facets.unwrap()["color"];
        assert_eq!(color.buckets.iter().find(|b| b.value == "red").unwrap().count, 3);
        assert_eq!(color.buckets.iter().find(|b| b.value == "blue").unwrap().count, 4);
    }
}
