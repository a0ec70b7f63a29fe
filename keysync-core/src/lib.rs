//! keysync core library: keymap payloads, config persistence and errors.
//!
//! Public API surface:
//! - [`types`]: keymap payloads exchanged with the translation service
//! - [`config`]: load / save / init of `~/.keysync/config.yaml`
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{ServiceConfig, SyncConfig};
pub use error::ConfigError;
pub use types::{
    AnalyzeResponse, GenerateResponse, Keymap, KeymapChanges, KeymapEntry, KeymapUpdate,
    ParseResponse,
};
