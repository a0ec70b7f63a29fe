//! keysync daemon runtime: per-file watchers + serial sync processor + control socket.

mod error;
pub mod paths;
pub mod protocol;
mod runtime;
pub mod status;
pub mod watcher;

pub use error::DaemonError;
pub use protocol::{DaemonClient, DaemonReply, DaemonRequest, DaemonStatus, SyncSummary, Trigger};
pub use runtime::{init_tracing, run, start_blocking};
pub use status::{StatusEntry, StatusLog};
pub use watcher::{Debouncer, PathWatcher, Side};
