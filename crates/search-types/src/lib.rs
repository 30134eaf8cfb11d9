//! Shared data model for the search core.
//!
//! Every other crate in the workspace depends on this one for the types
//! that cross component boundaries: index configuration, shard identity,
//! placement entries, sync-state checkpoints, the document envelope, the
//! query AST and the error taxonomy. Keeping them here (instead of letting
//! each component define its own) is what lets the indexing pipeline, the
//! search engine and the cluster coordinator agree on a single vocabulary.

pub mod config;
pub mod document;
pub mod error;
pub mod query;
pub mod search;
pub mod shard;
pub mod sync;

pub use config::{DistributionConfig, FieldMapping, FieldType, IndexConfig, Mappings, SourceCollection};
pub use document::Document;
pub use error::{Error, Result};
pub use query::Query;
pub use search::{FacetBucket, FacetKind, FacetRequest, FacetResult, Hit, SearchRequest, SearchResult};
pub use shard::{PlacementEntry, ShardIdentity};
pub use sync::{CollectionSyncState, SyncStatus};
