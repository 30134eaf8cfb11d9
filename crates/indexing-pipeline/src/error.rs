use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Source(#[from] source_adapter::Error),
    #[error(transparent)]
    Engine(#[from] search_engine::Error),
    #[error(transparent)]
    SyncState(#[from] sync_state::Error),
}

impl From<Error> for search_types::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Source(e) => e.into(),
            Error::Engine(e) => e.into(),
            Error::SyncState(e) => e.into(),
        }
    }
}
