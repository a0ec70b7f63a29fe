//! Per-file change detection.
//!
//! A [`PathWatcher`] owns one `notify` watcher on the parent directory of a
//! single file, filters raw events down to that file, and feeds a
//! [`Debouncer`]. Only the settled change leaves this module, as a [`Side`]
//! on the channel given at construction.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{fs_err, DaemonError};

/// Which of the two synced files changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Native,
    Shared,
}

// ---------------------------------------------------------------------------
// Debouncer
// ---------------------------------------------------------------------------

/// Cancel-and-reschedule timer: every [`poke`](Self::poke) aborts the pending
/// timer and starts a new one, so `side` is emitted once, `window` after the
/// last poke.
///
/// Must be used inside a tokio runtime.
pub struct Debouncer {
    side: Side,
    window: Duration,
    tx: mpsc::UnboundedSender<Side>,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(side: Side, window: Duration, tx: mpsc::UnboundedSender<Side>) -> Self {
        Self {
            side,
            window,
            tx,
            pending: None,
        }
    }

    pub fn poke(&mut self) {
        self.cancel();
        let (side, window, tx) = (self.side, self.window, self.tx.clone());
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let _ = tx.send(side);
        }));
    }

    /// Drop the pending emission, if any.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ---------------------------------------------------------------------------
// PathWatcher
// ---------------------------------------------------------------------------

/// Watches one file and emits debounced change notifications.
///
/// Released on [`stop`](Self::stop) or drop; a stopped watcher can be started
/// again.
pub struct PathWatcher {
    path: PathBuf,
    side: Side,
    window: Duration,
    tx: mpsc::UnboundedSender<Side>,
    watcher: Option<RecommendedWatcher>,
    pump: Option<JoinHandle<()>>,
}

impl PathWatcher {
    pub fn new(
        path: PathBuf,
        side: Side,
        window: Duration,
        tx: mpsc::UnboundedSender<Side>,
    ) -> Self {
        Self {
            path,
            side,
            window,
            tx,
            watcher: None,
            pump: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }

    /// Begin watching. Creates the parent directory if needed, since the file
    /// itself may not exist yet. No-op if already running.
    pub fn start(&mut self) -> Result<(), DaemonError> {
        if self.is_running() {
            return Ok(());
        }

        let Some(file_name) = self.path.file_name().map(|n| n.to_os_string()) else {
            return Err(DaemonError::Unwatchable {
                path: self.path.clone(),
            });
        };
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| fs_err(&dir, e))?;
        }

        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = recommended_watcher(move |event| {
            let _ = event_tx.send(event);
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::debug!(path = %self.path.display(), side = ?self.side, "watching file");

        let mut debouncer = Debouncer::new(self.side, self.window, self.tx.clone());
        self.pump = Some(tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                match event {
                    Ok(event) if is_target_event(&event, &file_name) => debouncer.poke(),
                    Ok(_) => {}
                    Err(err) => tracing::warn!(error = %err, "watcher event error"),
                }
            }
        }));
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Stop watching and drop any pending debounced notification.
    pub fn stop(&mut self) {
        if self.watcher.take().is_some() {
            tracing::debug!(path = %self.path.display(), "stopped watching file");
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

impl Drop for PathWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

fn is_target_event(event: &Event, file_name: &OsString) -> bool {
    is_relevant_event_kind(&event.kind)
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}
