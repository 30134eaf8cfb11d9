use serde::{Deserialize, Serialize};

/// A logical shard: `(index_name, shard_ordinal, replica_ordinal)` (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ShardIdentity {
    pub index_name: String,
    pub shard_ordinal: u32,
    pub replica_ordinal: u32,
}

impl ShardIdentity {
    pub fn new(index_name: impl Into<String>, shard_ordinal: u32, replica_ordinal: u32) -> Self {
        ShardIdentity { index_name: index_name.into(), shard_ordinal, replica_ordinal }
    }

    /// The on-disk directory name for this shard, per §3: `{index}_shard_{n}`
    /// when the index has more than one shard, else just `{index}`.
    pub fn physical_name(&self, total_shards: u32) -> String {
        physical_shard_name(&self.index_name, self.shard_ordinal, total_shards)
    }

    /// The ring/placement key: `"{node_id}:{index_name}:r{replica}:s{shard}"`.
    pub fn shard_key(&self, node_id: &str) -> String {
        format!(
            "{node_id}:{}:r{}:s{}",
            self.index_name, self.replica_ordinal, self.shard_ordinal
        )
    }
}

/// The physical on-disk shard name for `shard_ordinal` out of `total_shards`
/// belonging to `index_name` (§3).
pub fn physical_shard_name(index_name: &str, shard_ordinal: u32, total_shards: u32) -> String {
    if total_shards > 1 {
        format!("{index_name}_shard_{shard_ordinal}")
    } else {
        index_name.to_string()
    }
}

/// A `shard_key -> node_id` record in the coordinator's replicated state
/// machine (§3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlacementEntry {
    pub shard_key: String,
    pub node_id: String,
}

/// Parses a `"{node_id}:{index_name}:r{replica}:s{shard}"` shard key back
/// into its components. Used by the ring to recover shard identity from a
/// placement entry without storing it redundantly.
pub fn parse_shard_key(shard_key: &str) -> Option<(String, String, u32, u32)> {
    let mut parts = shard_key.splitn(4, ':');
    let node_id = parts.next()?.to_string();
    let index_name = parts.next()?.to_string();
    let replica_part = parts.next()?;
    let shard_part = parts.next()?;
    let replica_ordinal = replica_part.strip_prefix('r')?.parse().ok()?;
    let shard_ordinal = shard_part.strip_prefix('s')?.parse().ok()?;
    Some((node_id, index_name, replica_ordinal, shard_ordinal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_name_drops_suffix_when_unsharded() {
        assert_eq!(physical_shard_name("products", 0, 1), "products");
        assert_eq!(physical_shard_name("products", 0, 2), "products_shard_0");
        assert_eq!(physical_shard_name("products", 3, 4), "products_shard_3");
    }

    #[test]
    fn shard_key_round_trips() {
        let shard = ShardIdentity::new("products", 2, 1);
        let key = shard.shard_key("node-a");
        assert_eq!(key, "node-a:products:r1:s2");
        assert_eq!(
            parse_shard_key(&key),
            Some(("node-a".to_string(), "products".to_string(), 1, 2))
        );
    }
}
