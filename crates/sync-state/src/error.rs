use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to persist sync-state manifest: {0}")]
    Store(#[from] file_store::Error),
    #[error("failed to (de)serialize sync-state manifest: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<Error> for search_types::Error {
    fn from(e: Error) -> Self {
        search_types::Error::SyncStateWriteFailed(e.to_string())
    }
}
