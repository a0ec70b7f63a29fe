use std::io;
use std::path::PathBuf;

use thiserror::Error;

use keysync_core::ConfigError;

#[derive(Debug, Error)]
pub enum DaemonError {
    /// Creating the run directory or a watched file's parent failed.
    #[error("cannot prepare {path}: {source}")]
    Fs {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("control socket {socket}: {source}")]
    Socket {
        socket: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no daemon listening on {socket}")]
    NotRunning { socket: PathBuf },

    #[error("another daemon already listens on {socket}")]
    AlreadyRunning { socket: PathBuf },

    #[error("cannot watch {path}: path has no file name")]
    Unwatchable { path: PathBuf },

    #[error("file watch failed: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("malformed control message: {0}")]
    Message(#[from] serde_json::Error),

    /// The daemon understood the request and answered with an error.
    #[error("daemon rejected request: {0}")]
    Rejected(String),

    #[error("daemon closed the connection without replying")]
    NoReply,

    #[error("{0} closed, daemon is shutting down")]
    QueueClosed(&'static str),

    #[error("{task} task failed: {reason}")]
    Task { task: &'static str, reason: String },

    #[error("cannot start async runtime: {0}")]
    Runtime(#[source] io::Error),
}

pub(crate) fn fs_err(path: impl Into<PathBuf>, source: io::Error) -> DaemonError {
    DaemonError::Fs {
        path: path.into(),
        source,
    }
}

pub(crate) fn socket_err(socket: impl Into<PathBuf>, source: io::Error) -> DaemonError {
    DaemonError::Socket {
        socket: socket.into(),
        source,
    }
}
