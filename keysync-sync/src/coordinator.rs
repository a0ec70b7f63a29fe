//! Bidirectional sync coordinator.
//!
//! ## Transaction shape (both directions)
//!
//! 1. Skip if a write from this coordinator is in flight (`syncing`).
//! 2. Read the changed file; skip quietly if it cannot be read.
//! 3. Skip if its hash equals the hash we last wrote there (echo).
//! 4. Ask the translation service for the other side's content.
//! 5. Write the other file under the `syncing` guard, recording its hash first.
//! 6. Report the outcome.
//!
//! Hard failures in steps 4 and 5 are caught once per transaction, logged,
//! and reported as a single failure message. The `syncing` flag is released by a
//! drop guard, so no exit path can leave it set.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use keysync_core::Keymap;

use crate::collab::{FileAccess, StatusReporter, TranslationService};
use crate::error::SyncError;
use crate::hash::ContentHash;
use crate::summary::summarize;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// The two files kept in sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPaths {
    /// The editor's own keybinding file.
    pub native: PathBuf,
    /// The cross-editor keymap file.
    pub shared: PathBuf,
}

/// Why a transaction finished without writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another write from this coordinator was in flight.
    Busy,
    /// The changed file could not be read.
    Unreadable,
    /// The changed file holds exactly what this coordinator last wrote there.
    Echo,
    /// The service returned no keymap.
    NoKeymap,
    /// The service reported an empty diff.
    NoChanges,
    /// The generated native config equals the current one.
    Identical,
    /// Bootstrap found nothing to do.
    NotNeeded,
}

/// Result of one sync transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The other file was rewritten.
    Written { path: PathBuf, summary: String },
    Skipped(SkipReason),
    /// A hard failure was reported to the user.
    Failed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    NativeToShared,
    SharedToNative,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::NativeToShared => write!(f, "native -> shared"),
            Direction::SharedToNative => write!(f, "shared -> native"),
        }
    }
}

// ---------------------------------------------------------------------------
// Syncing guard
// ---------------------------------------------------------------------------

/// Holds the `syncing` flag for the duration of a write.
struct SyncingGuard<'a>(&'a AtomicBool);

impl<'a> SyncingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Keeps a native keybinding file and a shared keymap file consistent.
///
/// Transactions must be serialised by the caller (one worker feeding one
/// coordinator). The `syncing` flag and hash table are loop protection, not a
/// lock between concurrent workers.
pub struct SyncCoordinator<F, T, R> {
    paths: SyncPaths,
    editor: String,
    files: F,
    service: T,
    reporter: R,
    syncing: AtomicBool,
    last_written: Mutex<HashMap<PathBuf, ContentHash>>,
}

impl<F, T, R> SyncCoordinator<F, T, R>
where
    F: FileAccess,
    T: TranslationService,
    R: StatusReporter,
{
    /// `editor` is the human-facing editor name used in status messages.
    pub fn new(paths: SyncPaths, editor: impl Into<String>, files: F, service: T, reporter: R) -> Self {
        Self {
            paths,
            editor: editor.into(),
            files,
            service,
            reporter,
            syncing: AtomicBool::new(false),
            last_written: Mutex::new(HashMap::new()),
        }
    }

    pub fn paths(&self) -> &SyncPaths {
        &self.paths
    }

    pub fn files(&self) -> &F {
        &self.files
    }

    pub fn service(&self) -> &T {
        &self.service
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// `true` while a sync-induced write is in flight.
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    /// Hash this coordinator last recorded for `path`, if any.
    pub fn last_written_hash(&self, path: &Path) -> Option<ContentHash> {
        self.last_written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Propagate the native file into the shared keymap.
    pub async fn on_native_file_changed(&self) -> SyncOutcome {
        let (content, hash) = match self.read_source(&self.paths.native) {
            Ok(source) => source,
            Err(reason) => return SyncOutcome::Skipped(reason),
        };
        match self.native_to_shared(&content, hash).await {
            Ok(outcome) => outcome,
            Err(err) => self.fail(Direction::NativeToShared, err),
        }
    }

    /// Propagate the shared keymap into the native file.
    pub async fn on_shared_file_changed(&self) -> SyncOutcome {
        let (content, hash) = match self.read_source(&self.paths.shared) {
            Ok(source) => source,
            Err(reason) => return SyncOutcome::Skipped(reason),
        };
        match self.shared_to_native(&content, hash).await {
            Ok(outcome) => outcome,
            Err(err) => self.fail(Direction::SharedToNative, err),
        }
    }

    /// Seed the shared keymap from the native file on first run.
    ///
    /// Runs the native -> shared transaction once when the shared file is
    /// missing and the native file exists; otherwise does nothing.
    pub async fn initialize_if_needed(&self) -> SyncOutcome {
        if self.files.exists(&self.paths.shared) {
            tracing::debug!("shared keymap present, no bootstrap: {}", self.paths.shared.display());
            return SyncOutcome::Skipped(SkipReason::NotNeeded);
        }
        if !self.files.exists(&self.paths.native) {
            tracing::debug!("no native config to seed from: {}", self.paths.native.display());
            return SyncOutcome::Skipped(SkipReason::NotNeeded);
        }
        tracing::info!(
            "seeding shared keymap {} from {}",
            self.paths.shared.display(),
            self.paths.native.display()
        );
        self.on_native_file_changed().await
    }

    // -----------------------------------------------------------------------
    // Directions
    // -----------------------------------------------------------------------

    async fn native_to_shared(
        &self,
        native: &str,
        native_hash: ContentHash,
    ) -> Result<SyncOutcome, SyncError> {
        let baseline = self.load_baseline().await;

        let analyzed = self
            .service
            .analyze_editor_config(native, baseline.as_ref())
            .await?;
        let Some(keymap) = analyzed.keymap else {
            tracing::warn!(
                "translation service returned no keymap for {}",
                self.paths.native.display()
            );
            return Ok(SyncOutcome::Skipped(SkipReason::NoKeymap));
        };
        if analyzed.changes.as_ref().is_some_and(|c| c.is_empty()) {
            tracing::debug!("no structural changes in {}", self.paths.native.display());
            self.record(&self.paths.native, native_hash);
            return Ok(SyncOutcome::Skipped(SkipReason::NoChanges));
        }
        let summary = summarize(analyzed.changes.as_ref());

        let generated = self.service.generate_keymap(&keymap).await?;
        self.write_guarded(&self.paths.shared, &generated.content)?;
        self.record(&self.paths.native, native_hash);

        let message = if summary.is_empty() {
            format!("Synced {} keybindings to shared keymap", self.editor)
        } else {
            format!("Synced {} keybindings to shared keymap ({summary})", self.editor)
        };
        self.reporter.report(&message);

        Ok(SyncOutcome::Written {
            path: self.paths.shared.clone(),
            summary,
        })
    }

    async fn shared_to_native(
        &self,
        shared: &str,
        shared_hash: ContentHash,
    ) -> Result<SyncOutcome, SyncError> {
        let parsed = self.service.parse_keymap(shared).await?;
        let Some(keymap) = parsed.keymap else {
            tracing::warn!(
                "translation service returned no keymap for {}",
                self.paths.shared.display()
            );
            return Ok(SyncOutcome::Skipped(SkipReason::NoKeymap));
        };

        // The native config is allowed to not exist yet.
        let current = self.files.read(&self.paths.native).unwrap_or_else(|err| {
            tracing::debug!("native config unreadable, starting empty: {err}");
            String::new()
        });

        let generated = self
            .service
            .generate_editor_config(&keymap, &current)
            .await?;
        if generated.content == current {
            tracing::debug!("native config already up to date: {}", self.paths.native.display());
            return Ok(SyncOutcome::Skipped(SkipReason::Identical));
        }

        self.write_guarded(&self.paths.native, &generated.content)?;
        self.record(&self.paths.shared, shared_hash);

        self.reporter
            .report(&format!("Synced {} keybindings from shared config", self.editor));

        Ok(SyncOutcome::Written {
            path: self.paths.native.clone(),
            summary: String::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Busy guard, then read, then echo guard.
    fn read_source(&self, path: &Path) -> Result<(String, ContentHash), SkipReason> {
        if self.is_syncing() {
            tracing::debug!("sync in flight, ignoring change to {}", path.display());
            return Err(SkipReason::Busy);
        }

        let content = self.files.read(path).map_err(|err| {
            tracing::debug!("skipping unreadable {}: {err}", path.display());
            SkipReason::Unreadable
        })?;

        let hash = ContentHash::of(&content);
        if self.last_written_hash(path).as_ref() == Some(&hash) {
            tracing::debug!("ignoring echo of our own write to {}", path.display());
            return Err(SkipReason::Echo);
        }
        Ok((content, hash))
    }

    /// Current shared keymap as a diff baseline; any failure means no baseline.
    async fn load_baseline(&self) -> Option<Keymap> {
        let shared = &self.paths.shared;
        if !self.files.exists(shared) {
            return None;
        }
        let content = match self.files.read(shared) {
            Ok(content) => content,
            Err(err) => {
                tracing::debug!("no baseline, shared keymap unreadable: {err}");
                return None;
            }
        };
        match self.service.parse_keymap(&content).await {
            Ok(parsed) => parsed.keymap,
            Err(err) => {
                tracing::debug!("no baseline, shared keymap did not parse: {err}");
                None
            }
        }
    }

    /// Write `content` to `path` with the `syncing` flag held.
    ///
    /// The hash is recorded before the write so a watcher firing mid-write
    /// already sees it.
    fn write_guarded(&self, path: &Path, content: &str) -> Result<(), SyncError> {
        let _guard = SyncingGuard::enter(&self.syncing);
        self.files.ensure_parent_dir(path)?;
        self.record(path, ContentHash::of(content));
        self.files.write(path, content)?;
        tracing::info!("wrote: {}", path.display());
        Ok(())
    }

    fn record(&self, path: &Path, hash: ContentHash) {
        self.last_written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), hash);
    }

    fn fail(&self, direction: Direction, err: SyncError) -> SyncOutcome {
        tracing::error!("sync {direction} failed: {err}");
        let message = match direction {
            Direction::NativeToShared => format!(
                "Failed to sync {} keybindings to shared keymap: {err}",
                self.editor
            ),
            Direction::SharedToNative => format!(
                "Failed to sync shared keymap to {} keybindings: {err}",
                self.editor
            ),
        };
        self.reporter.report(&message);
        SyncOutcome::Failed { message }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
