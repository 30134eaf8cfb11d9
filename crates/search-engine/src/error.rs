use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open shard `{0}`: {1}")]
    ShardOpenFailed(String, String),
    #[error("index `{0}` not found")]
    IndexNotFound(String),
    #[error("unknown analyzer `{0}`")]
    UnknownAnalyzer(String),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("bulk write failed on shard `{0}`: {1}")]
    BulkWriteFailed(String, String),
    #[error(transparent)]
    Tantivy(#[from] tantivy::TantivyError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<Error> for search_types::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::ShardOpenFailed(name, reason) => search_types::Error::ShardOpenFailed(name, reason),
            Error::IndexNotFound(name) => search_types::Error::IndexNotFound(name),
            Error::UnknownAnalyzer(name) => {
                search_types::Error::ConfigInvalid(format!("unknown analyzer `{name}`"))
            }
            Error::InvalidQuery(msg) => search_types::Error::InvalidQuery(msg),
            Error::BulkWriteFailed(shard, reason) => {
                search_types::Error::BulkWriteFailed(shard, reason)
            }
            Error::Tantivy(e) => search_types::Error::ShardOpenFailed("unknown".to_string(), e.to_string()),
            Error::Io(e) => search_types::Error::Io(e),
        }
    }
}
