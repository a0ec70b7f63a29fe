//! # keysync-sync
//!
//! Bidirectional sync coordinator between a native editor keybinding file and
//! a shared cross-editor keymap.
//!
//! Build a [`SyncCoordinator`] from the three collaborators in [`collab`] and
//! call [`SyncCoordinator::on_native_file_changed`] or
//! [`SyncCoordinator::on_shared_file_changed`] whenever a watched file settles.
//! [`SyncCoordinator::initialize_if_needed`] seeds the shared file on first run.

pub mod collab;
pub mod coordinator;
pub mod error;
pub mod fs;
pub mod hash;
pub mod summary;

#[cfg(test)]
mod fakes;

pub use collab::{FileAccess, LogReporter, StatusReporter, TranslationService};
pub use coordinator::{SkipReason, SyncCoordinator, SyncOutcome, SyncPaths};
pub use error::{FileAccessError, ServiceError, SyncError};
pub use fs::DiskFileAccess;
pub use hash::ContentHash;
pub use summary::summarize;
