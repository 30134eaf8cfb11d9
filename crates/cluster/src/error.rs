use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("consensus unavailable: {0}")]
    Unavailable(String),
    #[error("not the current leader; forward to {0:?}")]
    NotLeader(Option<String>),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] file_store::Error),
}

impl From<Error> for search_types::Error {
    fn from(e: Error) -> Self {
        search_types::Error::ConsensusUnavailable(e.to_string())
    }
}
