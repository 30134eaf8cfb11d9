//! Read-only view over the externally administered source collections
//! (§4.2). An adapter never writes to the source database except through
//! the narrow, explicit `backfill_field` operation used to stamp documents
//! that predate a timestamp field.

pub mod error;
pub mod mongo;
pub mod timestamp;

use async_trait::async_trait;
use futures::stream::BoxStream;

pub use error::{Error, Result};
pub use mongo::MongoSourceAdapter;
pub use timestamp::{parse_timestamp, Timestamp};

use search_types::{Document, SourceCollection};

/// A single document read from a source collection, paired with the raw
/// intrinsic id so callers can route/delete without re-parsing it.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub document: Document,
    pub timestamp: Option<Timestamp>,
}

/// A read-mostly view over one external source database. Implementations
/// must tolerate the source being momentarily unreachable (§7,
/// `Error::Unavailable`) without poisoning long-lived state.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Streams every document in `collection`, optionally capped at `limit`.
    /// Used for the initial full index build (§4.5).
    async fn find_all(
        &self,
        collection: &SourceCollection,
        limit: Option<u64>,
    ) -> Result<BoxStream<'_, Result<SourceDocument>>>;

    /// Streams documents in `collection` whose `timestamp_field` is strictly
    /// greater than `since`, ordered ascending by that field. When
    /// `timestamp_field` is the intrinsic id sentinel (`"_id"`), ordering and
    /// comparison use the id's embedded creation time (§3).
    async fn find_since(
        &self,
        collection: &SourceCollection,
        timestamp_field: &str,
        since: Timestamp,
        limit: Option<u64>,
    ) -> Result<BoxStream<'_, Result<SourceDocument>>>;

    /// The highest value of `timestamp_field` across `collection`, or the
    /// Unix epoch if the collection is empty (§4.1's `not_available` floor).
    async fn max_timestamp(
        &self,
        collection: &SourceCollection,
        timestamp_field: &str,
    ) -> Result<Timestamp>;

    /// Exact document count in `collection`, used for progress recomputation
    /// (§4.1). `filter` is an optional raw query document.
    async fn count(
        &self,
        collection: &SourceCollection,
        filter: Option<serde_json::Value>,
    ) -> Result<u64>;

    /// Whether at least one document in `collection` carries `field`.
    /// Used to decide whether a configured timestamp field needs backfilling
    /// before incremental polling can begin.
    async fn has_field(&self, collection: &SourceCollection, field: &str) -> Result<bool>;

    /// Sets `field` to `value` on every document in `collection` missing it.
    /// Returns the number of documents touched. This is the one write path
    /// an adapter exposes against the source database (§4.2).
    async fn backfill_field(
        &self,
        collection: &SourceCollection,
        field: &str,
        value: Timestamp,
    ) -> Result<u64>;
}
