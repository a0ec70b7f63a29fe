//! Control socket wire format and the blocking client the CLI uses.
//!
//! One JSON object per line in each direction:
//!
//! ```text
//! -> {"cmd":"status"}                  <- {"result":"ok","data":{...DaemonStatus}}
//! -> {"cmd":"sync","direction":"shared"} <- {"result":"ok","data":{...SyncSummary}}
//! -> {"cmd":"stop"}                    <- {"result":"ok","data":null}
//!                                      <- {"result":"error","message":"..."}
//! ```

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use keysync_sync::SyncOutcome;

use crate::error::{socket_err, DaemonError};
use crate::paths::socket_path;
use crate::status::{unix_seconds_now, StatusEntry};
use crate::watcher::Side;

/// Which sync transaction to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// Native file changed: native -> shared.
    Native,
    /// Shared file changed: shared -> native.
    Shared,
    /// Seed the shared file if it is missing.
    Bootstrap,
}

impl From<Side> for Trigger {
    fn from(side: Side) -> Self {
        match side {
            Side::Native => Trigger::Native,
            Side::Shared => Trigger::Shared,
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Native => write!(f, "native"),
            Trigger::Shared => write!(f, "shared"),
            Trigger::Bootstrap => write!(f, "bootstrap"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum DaemonRequest {
    Status,
    /// Run one transaction through the daemon's queue and wait for it.
    Sync { direction: Trigger },
    Stop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum DaemonReply {
    Ok { data: Value },
    Error { message: String },
}

impl DaemonReply {
    pub fn ok(data: Value) -> Self {
        DaemonReply::Ok { data }
    }

    pub fn error(message: impl Into<String>) -> Self {
        DaemonReply::Error {
            message: message.into(),
        }
    }

    /// Decode the `ok` payload, or surface the daemon's error message.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, DaemonError> {
        match self {
            DaemonReply::Ok { data } => Ok(serde_json::from_value(data)?),
            DaemonReply::Error { message } => Err(DaemonError::Rejected(message)),
        }
    }
}

/// Outcome of one processed sync job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub trigger: Trigger,
    /// `startup`, `watcher`, or `socket`.
    pub source: String,
    /// `written`, `skipped`, or `failed`.
    pub result: String,
    pub detail: String,
    pub finished_at_unix: u64,
    pub duration_ms: u64,
}

impl SyncSummary {
    pub(crate) fn from_outcome(
        trigger: Trigger,
        source: &str,
        outcome: &SyncOutcome,
        took: Duration,
    ) -> Self {
        let (result, detail) = match outcome {
            SyncOutcome::Written { path, summary } if summary.is_empty() => {
                ("written", path.display().to_string())
            }
            SyncOutcome::Written { path, summary } => {
                ("written", format!("{} ({summary})", path.display()))
            }
            SyncOutcome::Skipped(reason) => ("skipped", format!("{reason:?}")),
            SyncOutcome::Failed { message } => ("failed", message.clone()),
        };
        Self {
            trigger,
            source: source.to_string(),
            result: result.to_string(),
            detail,
            finished_at_unix: unix_seconds_now(),
            duration_ms: u64::try_from(took.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Reply to [`DaemonRequest::Status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub started_at_unix: u64,
    pub editor: String,
    pub native_path: PathBuf,
    pub shared_path: PathBuf,
    pub service_url: String,
    pub last_sync: Option<SyncSummary>,
    /// Oldest first.
    pub recent: Vec<StatusEntry>,
    pub socket: PathBuf,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Blocking client for a daemon's control socket. Every call opens a fresh
/// connection, sends one request and reads one reply.
#[derive(Debug, Clone)]
pub struct DaemonClient {
    socket: PathBuf,
}

impl DaemonClient {
    pub fn new(home: &Path) -> Self {
        Self::at_socket(socket_path(home))
    }

    pub fn at_socket(socket: PathBuf) -> Self {
        Self { socket }
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// True if something accepts connections on the socket.
    pub fn is_running(&self) -> bool {
        UnixStream::connect(&self.socket).is_ok()
    }

    pub fn status(&self) -> Result<DaemonStatus, DaemonError> {
        self.call(DaemonRequest::Status)?.into_data()
    }

    /// Blocks until the daemon has processed the job.
    pub fn sync(&self, direction: Trigger) -> Result<SyncSummary, DaemonError> {
        self.call(DaemonRequest::Sync { direction })?.into_data()
    }

    pub fn stop(&self) -> Result<(), DaemonError> {
        self.call(DaemonRequest::Stop)?.into_data::<Value>().map(drop)
    }

    pub fn call(&self, request: DaemonRequest) -> Result<DaemonReply, DaemonError> {
        let mut stream = self.connect()?;

        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        stream
            .write_all(line.as_bytes())
            .and_then(|()| stream.flush())
            .map_err(|e| socket_err(&self.socket, e))?;

        let mut reply = String::new();
        let read = BufReader::new(stream)
            .read_line(&mut reply)
            .map_err(|e| socket_err(&self.socket, e))?;
        if read == 0 {
            return Err(DaemonError::NoReply);
        }
        Ok(serde_json::from_str(reply.trim_end())?)
    }

    fn connect(&self) -> Result<UnixStream, DaemonError> {
        UnixStream::connect(&self.socket).map_err(|err| match err.kind() {
            ErrorKind::NotFound | ErrorKind::ConnectionRefused => DaemonError::NotRunning {
                socket: self.socket.clone(),
            },
            _ => socket_err(&self.socket, err),
        })
    }
}
