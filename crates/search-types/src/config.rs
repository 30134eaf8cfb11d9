use serde::{Deserialize, Serialize};

/// The sentinel timestamp field name meaning "order by the document's
/// intrinsic creation-ordered identifier" (§3, `IndexConfig.timestamp_field`).
pub const INTRINSIC_ID_SENTINEL: &str = "_id";

/// Declarative description of a logical index (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexConfig {
    /// Unique within the cluster.
    pub name: String,
    pub source_collection: SourceCollection,
    #[serde(default)]
    pub distribution: DistributionConfig,
    /// Field used to order documents for polling. Defaults to
    /// [`INTRINSIC_ID_SENTINEL`].
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,
    /// Field used as the indexed document's primary key.
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// Poll interval in seconds. `None` means "derive from the search-level
    /// flush interval, lower-bounded at 1s" (resolved by the caller, since
    /// that default lives outside this type).
    pub poll_interval: Option<u64>,
    #[serde(default)]
    pub mappings: Mappings,
}

fn default_timestamp_field() -> String {
    INTRINSIC_ID_SENTINEL.to_string()
}

fn default_id_field() -> String {
    "_id".to_string()
}

impl IndexConfig {
    /// The poll interval to use, applying the fallback described in §3.
    pub fn effective_poll_interval(&self, search_flush_interval_secs: u64) -> u64 {
        self.poll_interval.unwrap_or(search_flush_interval_secs.max(1))
    }

    pub fn is_sharded(&self) -> bool {
        self.distribution.shards > 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceCollection {
    pub database: String,
    pub collection: String,
}

impl SourceCollection {
    /// `database.collection`, used as `CollectionSyncState.collection_key`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DistributionConfig {
    pub replicas: u32,
    pub shards: u32,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        DistributionConfig { replicas: 1, shards: 1 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mappings {
    #[serde(default)]
    pub dynamic: bool,
    #[serde(default)]
    pub fields: Vec<FieldMapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldMapping {
    pub name: String,
    /// Source document field this mapping reads from. Defaults to `name`
    /// when absent, letting mapping names double as source paths unless
    /// told otherwise.
    pub source_field: Option<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub analyzer: Option<String>,
    #[serde(default)]
    pub facet: bool,
}

impl FieldMapping {
    pub fn source_field(&self) -> &str {
        self.source_field.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Keyword,
    Numeric,
    Date,
    Boolean,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let yaml = r#"
name: products
source_collection:
  database: shop
  collection: products
"#;
        let cfg: IndexConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.timestamp_field, "_id");
        assert_eq!(cfg.id_field, "_id");
        assert_eq!(cfg.distribution, DistributionConfig { replicas: 1, shards: 1 });
        assert!(!cfg.is_sharded());
        assert_eq!(cfg.effective_poll_interval(30), 30);
        assert_eq!(cfg.effective_poll_interval(0), 1);
    }

    #[test]
    fn explicit_poll_interval_wins_over_flush_fallback() {
        let cfg = IndexConfig {
            name: "n".into(),
            source_collection: SourceCollection { database: "d".into(), collection: "c".into() },
            distribution: DistributionConfig::default(),
            timestamp_field: "updated_at".into(),
            id_field: "_id".into(),
            poll_interval: Some(5),
            mappings: Mappings::default(),
        };
        assert_eq!(cfg.effective_poll_interval(60), 5);
    }
}
