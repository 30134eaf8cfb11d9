use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The cross-cutting error taxonomy of §7, shared by every component so the
/// HTTP layer can map a single enum to a status code regardless of which
/// crate raised it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("source collection unavailable: {0}")]
    SourceUnavailable(String),

    #[error("failed to open shard `{0}`: {1}")]
    ShardOpenFailed(String, String),

    #[error("consensus unavailable: {0}")]
    ConsensusUnavailable(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("index not found: {0}")]
    IndexNotFound(String),

    #[error("bulk write failed on shard `{0}`: {1}")]
    BulkWriteFailed(String, String),

    #[error("failed to persist sync state: {0}")]
    SyncStateWriteFailed(String),

    #[error("could not parse timestamp `{0}`")]
    TimestampParseFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The HTTP status code the server crate's error mapping should use.
    /// Kept here (rather than in `crates/server`) so every crate agrees on
    /// the mapping without depending on `actix-web`.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::ConfigInvalid(_) => 500,
            Error::SourceUnavailable(_) => 503,
            Error::ShardOpenFailed(_, _) => 500,
            Error::ConsensusUnavailable(_) => 503,
            Error::InvalidQuery(_) => 400,
            Error::IndexNotFound(_) => 404,
            Error::BulkWriteFailed(_, _) => 500,
            Error::SyncStateWriteFailed(_) => 500,
            Error::TimestampParseFailed(_) => 400,
            Error::Io(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Error::ConfigInvalid(_) => "config_invalid",
            Error::SourceUnavailable(_) => "source_unavailable",
            Error::ShardOpenFailed(_, _) => "shard_open_failed",
            Error::ConsensusUnavailable(_) => "consensus_unavailable",
            Error::InvalidQuery(_) => "invalid_query",
            Error::IndexNotFound(_) => "index_not_found",
            Error::BulkWriteFailed(_, _) => "bulk_write_failed",
            Error::SyncStateWriteFailed(_) => "sync_state_write_failed",
            Error::TimestampParseFailed(_) => "timestamp_parse_failed",
            Error::Io(_) => "io_error",
        }
    }
}
