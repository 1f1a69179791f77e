//! Content fingerprints for change detection on the configuration file

use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// SHA-256 of a configuration file's bytes, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigFingerprint(String);

impl ConfigFingerprint {
    /// Fingerprint raw bytes
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Fingerprint the current content of a file
    pub fn read(path: impl AsRef<Path>) -> crate::Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Ok(Self::of(&bytes))
    }

    /// Hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Twelve hex digits are plenty to tell revisions apart in logs
        f.write_str(&self.0[..12])
    }
}
