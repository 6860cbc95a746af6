//! Content hashing used for change detection.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of some content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    /// The full hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated digest for display.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Incremental builder for a hash over several labelled inputs.
///
/// Every field is length-prefixed, so `("ab", "c")` and `("a", "bc")`
/// never produce the same fingerprint.
#[derive(Clone, Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a labelled field.
    pub fn field(mut self, label: &str, value: impl AsRef<[u8]>) -> Self {
        self.push(label, value.as_ref());
        self
    }

    /// Add a labelled field in place.
    pub fn push(&mut self, label: &str, value: &[u8]) {
        for part in [label.as_bytes(), value] {
            self.hasher.update((part.len() as u64).to_le_bytes());
            self.hasher.update(part);
        }
    }

    /// Finish hashing.
    pub fn finish(self) -> ContentHash {
        ContentHash(hex::encode(self.hasher.finalize()))
    }
}
