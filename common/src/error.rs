use std::io;

/// Crate-wide result alias, mirrors the teacher's `CResult<T>`.
pub type CResult<T> = Result<T, Error>;

/// The error taxonomy from spec.md §7: configuration, validation, capacity,
/// transport (retriable/fatal) and protocol mismatch all get their own
/// variant so callers can match on what actually went wrong.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("buffer capacity exceeded: {0}")]
    Capacity(String),

    #[error("transport error (retriable={retriable}): {message}")]
    Transport { retriable: bool, message: String },

    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn capacity(msg: impl Into<String>) -> Self {
        Error::Capacity(msg.into())
    }

    pub fn transport(retriable: bool, msg: impl Into<String>) -> Self {
        Error::Transport { retriable, message: msg.into() }
    }

    /// Whether this error, if surfaced from a transport send, is worth retrying.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Error::Transport { retriable: true, .. })
    }
}
