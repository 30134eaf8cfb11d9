use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("source database unavailable: {0}")]
    Unavailable(String),
    #[error("field `{0}` is missing from collection `{1}`")]
    MissingField(String, String),
    #[error("unsupported timestamp encoding: {0}")]
    UnsupportedTimestamp(String),
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),
}

impl From<Error> for search_types::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Unavailable(m) => search_types::Error::SourceUnavailable(m),
            Error::MissingField(f, c) => {
                search_types::Error::SourceUnavailable(format!("field `{f}` missing from `{c}`"))
            }
            Error::UnsupportedTimestamp(v) => search_types::Error::TimestampParseFailed(v),
            Error::Timeout(d) => search_types::Error::SourceUnavailable(format!("timed out after {d:?}")),
            Error::Driver(e) => search_types::Error::SourceUnavailable(e.to_string()),
        }
    }
}
