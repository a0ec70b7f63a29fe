//! SHA-256 content digests used for echo suppression.

use std::fmt;

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of raw file content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash `content` exactly as read; no line-ending normalisation.
    pub fn of(content: &str) -> Self {
        let mut h = Sha256::new();
        h.update(content.as_bytes());
        Self(hex::encode(h.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
