//! Bulk vs. individual document writes (§4.5 "Write path").

use std::collections::HashMap;

use search_engine::SearchEngine;
use serde_json::{Map, Value};
use tracing::warn;

/// One buffered document awaiting a write: its index id and field map.
pub type BufferedDoc = (String, Map<String, Value>);

/// Writes `batch` into `index_name`, choosing bulk or individual mode per
/// `bulk_indexing`. Bulk groups by physical shard and writes one batch per
/// shard, falling back to per-document writes for a shard whose bulk write
/// failed so a single bad document cannot drop its neighbors. Returns the
/// number of documents actually written.
pub fn write_batch(engine: &SearchEngine, index_name: &str, batch: &[BufferedDoc], bulk_indexing: bool) -> u64 {
    if batch.is_empty() {
        return 0;
    }
    if bulk_indexing {
        write_bulk(engine, index_name, batch)
    } else {
        write_individually(engine, index_name, batch)
    }
}

fn write_bulk(engine: &SearchEngine, index_name: &str, batch: &[BufferedDoc]) -> u64 {
    let mut by_shard: HashMap<String, Vec<BufferedDoc>> = HashMap::new();
    for (id, fields) in batch {
        match engine.physical_shard_for_doc(index_name, id) {
            Ok(shard) => by_shard.entry(shard).or_default().push((id.clone(), fields.clone())),
            Err(e) => warn!(index = index_name, doc_id = %id, error = %e, "could not route document, skipping"),
        }
    }

    let mut written = 0u64;
    for (shard, docs) in by_shard {
        match engine.index_batch(&shard, &docs) {
            Ok(()) => written += docs.len() as u64,
            Err(e) => {
                warn!(
                    shard = %shard,
                    error = %e,
                    docs = docs.len(),
                    "bulk write failed for shard, falling back to per-document writes"
                );
                written += write_individually(engine, index_name, &docs);
            }
        }
    }
    written
}

fn write_individually(engine: &SearchEngine, index_name: &str, batch: &[BufferedDoc]) -> u64 {
    let mut written = 0u64;
    for (id, fields) in batch {
        match engine.index_one(index_name, id, fields) {
            Ok(()) => written += 1,
            Err(e) => warn!(index = index_name, doc_id = %id, error = %e, "document write failed, skipping"),
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use search_types::config::{DistributionConfig, IndexConfig, Mappings, SourceCollection};
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
    fn bulk_write_groups_and_counts_all_documents() {
        let dir = TempDir::new().unwrap();
        let engine = SearchEngine::new(dir.path());
        engine.create_index(&cfg("widgets", 2)).unwrap();

        let batch: Vec<BufferedDoc> =
            (0..10).map(|i| (format!("w{i}"), Map::new())).collect();
        let written = write_batch(&engine, "widgets", &batch, true);
        assert_eq!(written, 10);
    }

    #[test]
    fn individual_write_counts_all_documents() {
        let dir = TempDir::new().unwrap();
        let engine = SearchEngine::new(dir.path());
        engine.create_index(&cfg("widgets", 1)).unwrap();

        let batch: Vec<BufferedDoc> = vec![("a".to_string(), Map::new()), ("b".to_string(), Map::new())];
        let written = write_batch(&engine, "widgets", &batch, false);
        assert_eq!(written, 2);
    }

    #[test]
    fn empty_batch_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let engine = SearchEngine::new(dir.path());
        engine.create_index(&cfg("widgets", 1)).unwrap();
        assert_eq!(write_batch(&engine, "widgets", &[], true), 0);
    }
}
