use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// `{index, query, facets?, size, from, highlight?}` (§4.6).
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub index: String,
    #[serde(default = "default_query")]
    pub query: Value,
    #[serde(default)]
    pub facets: Vec<FacetRequest>,
    #[serde(default)]
    pub highlight: Vec<String>,
    #[serde(default = "default_size")]
    pub size: i64,
    #[serde(default)]
    pub from: i64,
}

fn default_query() -> Value {
    Value::Object(Map::new())
}

fn default_size() -> i64 {
    10
}

/// Bounds from §6: `0 <= size <= 1000`, `from >= 0`, `from + size <= 10000`.
/// Size `0` means "use the default of 10".
pub const MAX_SIZE: i64 = 1000;
pub const MAX_FROM_PLUS_SIZE: i64 = 10_000;

impl SearchRequest {
    pub fn validate(&self) -> Result<(usize, usize)> {
        let size = if self.size == 0 { default_size() } else { self.size };
        if !(0..=MAX_SIZE).contains(&size) {
            return Err(Error::InvalidQuery(format!(
                "size must be between 0 and {MAX_SIZE}, got {size}"
            )));
        }
        if self.from < 0 {
            return Err(Error::InvalidQuery("from must be >= 0".to_string()));
        }
        if self.from + size > MAX_FROM_PLUS_SIZE {
            return Err(Error::InvalidQuery(format!(
                "from + size must be <= {MAX_FROM_PLUS_SIZE}"
            )));
        }
        Ok((self.from as usize, size as usize))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetRequest {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub kind: FacetKind,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FacetKind {
    #[default]
    Term,
    Numeric,
    Date,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub hits: Vec<Hit>,
    pub total: u64,
    #[serde(rename = "maxScore")]
    pub max_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facets: Option<HashMap<String, FacetResult>>,
    /// §9 design note: explicit partial-result signalling instead of the
    /// spec's baseline "silently drop failed shards".
    #[serde(default)]
    pub partial: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failed_shards: Vec<String>,
}

impl SearchResult {
    pub fn empty() -> Self {
        SearchResult {
            hits: Vec::new(),
            total: 0,
            max_score: 0.0,
            facets: None,
            partial: false,
            failed_shards: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
    pub score: f32,
    pub source: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<HashMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FacetResult {
    pub buckets: Vec<FacetBucket>,
}

impl FacetResult {
    /// Merges per-shard facet counts additively (§8 invariant 7): missing
    /// buckets on either side contribute zero.
    pub fn merge(mut self, other: FacetResult) -> FacetResult {
        for bucket in other.buckets {
            if let Some(existing) = self.buckets.iter_mut().find(|b| b.value == bucket.value) {
                existing.count += bucket.count;
            } else {
                self.buckets.push(bucket);
            }
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FacetBucket {
    pub value: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(size: i64, from: i64) -> SearchRequest {
        SearchRequest {
            index: "i".into(),
            query: Value::Null,
            facets: Vec::new(),
            highlight: Vec::new(),
            size,
            from,
        }
    }

    #[test]
    fn zero_size_defaults_to_ten() {
        let (from, size) = req(0, 0).validate().unwrap();
        assert_eq!((from, size), (0, 10));
    }

    #[test]
    fn oversized_size_is_rejected() {
        assert!(req(1001, 0).validate().is_err());
    }

    #[test]
    fn negative_from_is_rejected() {
        assert!(req(10, -1).validate().is_err());
    }

    #[test]
    fn from_plus_size_cap_is_enforced() {
        assert!(req(1000, 9999).validate().is_err());
        assert!(req(1000, 9000).validate().is_ok());
    }

    #[test]
    fn facet_merge_is_additive_with_missing_buckets_as_zero() {
        let a = FacetResult {
            buckets: vec![
                FacetBucket { value: "red".into(), count: 2 },
                FacetBucket { value: "blue".into(), count: 1 },
            ],
        };
        let b = FacetResult { buckets: vec![FacetBucket { value: "red".into(), count: 3 }] };
        let merged = a.merge(b);
        assert_eq!(
            merged.buckets.iter().find(|x| x.value == "red").unwrap().count,
            5
        );
        assert_eq!(
            merged.buckets.iter().find(|x| x.value == "blue").unwrap().count,
            1
        );
    }
}
