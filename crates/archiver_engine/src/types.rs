use thiserror::Error;

use crate::persist::PersistError;

/// Failure talking to the remote content API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("invalid url {url}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("http status {status} from {url}")]
    HttpStatus { url: String, status: u16 },
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },
    #[error("response from {url} carries no page count")]
    MissingPageCount { url: String },
    #[error("malformed response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Failure while archiving a single post. Aborts that post only.
#[derive(Debug, Error)]
pub enum PostError {
    #[error("author with remote id {remote_id} is not in the authors ledger")]
    MissingAuthor { remote_id: u64 },
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Failure that aborts a whole sync pass.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid site configuration: {0}")]
    Config(String),
    #[error("failed to build http client: {0}")]
    Client(String),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}
