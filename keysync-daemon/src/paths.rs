use std::path::{Path, PathBuf};

use keysync_core::config::keysync_dir_at;

pub const DAEMON_SOCKET: &str = "daemon.sock";

/// Number of status messages kept for `keysync daemon status`.
pub const STATUS_HISTORY: usize = 50;

pub fn run_dir(home: &Path) -> PathBuf {
    keysync_dir_at(home).join("run")
}

pub fn socket_path(home: &Path) -> PathBuf {
    run_dir(home).join(DAEMON_SOCKET)
}
