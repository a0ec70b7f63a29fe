//! Error types for keysync-sync.

use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by a [`FileAccess`](crate::collab::FileAccess) implementation.
#[derive(Debug, Error)]
pub enum FileAccessError {
    /// The file does not exist.
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    /// Any other I/O failure, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures surfaced by a [`TranslationService`](crate::collab::TranslationService).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("translation service unreachable: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("translation service returned {code}: {body}")]
    Status { code: u16, body: String },

    /// The request payload could not be encoded.
    #[error("could not encode translation request: {0}")]
    Encode(String),

    /// The response body was not the expected JSON shape.
    #[error("invalid translation service response: {0}")]
    Decode(String),

    /// The blocking request task panicked or was cancelled.
    #[error("translation request task failed: {0}")]
    Join(String),
}

/// All hard failures of a sync transaction.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    File(#[from] FileAccessError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Convenience constructor for [`FileAccessError`], mapping `NotFound` to its
/// own variant.
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> FileAccessError {
    let path = path.into();
    if source.kind() == std::io::ErrorKind::NotFound {
        FileAccessError::NotFound { path }
    } else {
        FileAccessError::Io { path, source }
    }
}
