//! Keymap payloads exchanged with the translation service.
//!
//! The unified keymap and its entries are opaque to keysync: they are produced
//! and consumed by the service and only passed through here. Every optional
//! response field is an `Option` and defaults to `None` when the service omits
//! it, so callers must handle the absent case explicitly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Opaque payloads
// ---------------------------------------------------------------------------

/// A full set of keybindings in the service's unified representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keymap(pub Value);

impl From<Value> for Keymap {
    fn from(v: Value) -> Self {
        Self(v)
    }
}

/// A single unified keybinding entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeymapEntry(pub Value);

impl From<Value> for KeymapEntry {
    fn from(v: Value) -> Self {
        Self(v)
    }
}

/// An entry present on both sides of a diff with different content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeymapUpdate {
    pub origin: KeymapEntry,
    pub updated: KeymapEntry,
}

/// Structural diff of a keymap against a baseline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeymapChanges {
    #[serde(default)]
    pub add: Vec<KeymapEntry>,
    #[serde(default)]
    pub remove: Vec<KeymapEntry>,
    #[serde(default)]
    pub update: Vec<KeymapUpdate>,
}

impl KeymapChanges {
    /// `true` when no entry was added, removed, or updated.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty() && self.update.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Service responses
// ---------------------------------------------------------------------------

/// Result of analysing a native editor config against a baseline keymap.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub keymap: Option<Keymap>,
    #[serde(default)]
    pub changes: Option<KeymapChanges>,
}

/// Generated file content (shared keymap or native editor config).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub content: String,
}

/// Result of parsing shared keymap content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParseResponse {
    #[serde(default)]
    pub keymap: Option<Keymap>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
