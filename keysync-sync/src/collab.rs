//! Collaborator interfaces the coordinator depends on.
//!
//! The coordinator never touches the filesystem, the network, or the user
//! directly; it goes through these three traits so each can be swapped for an
//! in-memory fake in tests.

use std::path::Path;

use async_trait::async_trait;

use keysync_core::{AnalyzeResponse, GenerateResponse, Keymap, ParseResponse};

use crate::error::{FileAccessError, ServiceError};

/// Synchronous file operations used inside a sync transaction.
pub trait FileAccess: Send + Sync {
    /// Read the whole file as UTF-8.
    fn read(&self, path: &Path) -> Result<String, FileAccessError>;

    /// Replace the file's content.
    fn write(&self, path: &Path, content: &str) -> Result<(), FileAccessError>;

    fn exists(&self, path: &Path) -> bool;

    /// Create every missing ancestor directory of `path`.
    fn ensure_parent_dir(&self, path: &Path) -> Result<(), FileAccessError>;
}

/// Fire-and-forget sink for user-visible status messages.
pub trait StatusReporter: Send + Sync {
    fn report(&self, message: &str);
}

/// The remote service that understands editor-specific formats.
///
/// Implementations enforce their own request deadline and surface it as a
/// [`ServiceError`]; the coordinator never retries.
#[async_trait]
pub trait TranslationService: Send + Sync {
    /// Convert native editor config into a unified keymap and diff it against
    /// `baseline` when one is given.
    async fn analyze_editor_config(
        &self,
        native_content: &str,
        baseline: Option<&Keymap>,
    ) -> Result<AnalyzeResponse, ServiceError>;

    /// Render a unified keymap as shared-file content.
    async fn generate_keymap(&self, keymap: &Keymap) -> Result<GenerateResponse, ServiceError>;

    /// Parse shared-file content into a unified keymap.
    async fn parse_keymap(&self, content: &str) -> Result<ParseResponse, ServiceError>;

    /// Render `keymap` as native editor config, keeping any entries of
    /// `current_native_content` that have no unified counterpart.
    async fn generate_editor_config(
        &self,
        keymap: &Keymap,
        current_native_content: &str,
    ) -> Result<GenerateResponse, ServiceError>;
}

/// [`StatusReporter`] that writes every message to the log at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl StatusReporter for LogReporter {
    fn report(&self, message: &str) {
        tracing::info!("{message}");
    }
}
