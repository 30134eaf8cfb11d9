//! FNV-1a-32 document routing (§3, §8 invariant 5): deterministic,
//! independent of node identity or insertion order, so every replica of a
//! shard computes the same placement for the same `doc_id`.

const FNV_OFFSET_BASIS: u32 = 0x811c9dc5;
const FNV_PRIME: u32 = 0x01000193;

pub fn fnv1a32(s: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in s.as_bytes() {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// The shard ordinal `doc_id` routes to, out of `shard_count` shards.
pub fn shard_for_doc_id(doc_id: &str, shard_count: u32) -> u32 {
    if shard_count <= 1 {
        return 0;
    }
    fnv1a32(doc_id) % shard_count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_shard_always_routes_to_zero() {
        assert_eq!(shard_for_doc_id("anything", 1), 0);
        assert_eq!(shard_for_doc_id("", 1), 0);
    }

    #[test]
    fn routing_is_deterministic() {
        let a = shard_for_doc_id("product-42", 8);
        let b = shard_for_doc_id("product-42", 8);
        assert_eq!(a, b);
    }

    #[test]
    fn routing_is_within_bounds() {
        for id in ["a", "b", "long-document-identifier-123", ""] {
            assert!(shard_for_doc_id(id, 5) < 5);
        }
    }

    #[test]
    fn known_fnv1a32_vector() {
        // Canonical FNV-1a 32-bit test vector for the empty string.
        assert_eq!(fnv1a32(""), FNV_OFFSET_BASIS);
    }

    proptest::proptest! {
        /// §8 invariant 5: routing a given `doc_id` is a pure function of
        /// `(doc_id, shard_count)` — same inputs, same shard, every time,
        /// and always in bounds.
        #[test]
        fn routing_is_pure_and_in_bounds(doc_id in ".*", shard_count in 1u32..64) {
            let a = shard_for_doc_id(&doc_id, shard_count);
            let b = shard_for_doc_id(&doc_id, shard_count);
            prop_assert_eq!(a, b);
            prop_assert!(a < shard_count);
        }
    }
}
