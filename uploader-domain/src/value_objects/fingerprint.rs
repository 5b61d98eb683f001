// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File Fingerprint Value Object
//!
//! A stable identifier for a tracked file, derived from its absolute path,
//! size, and whole-file content hash. Used as the producer message key so
//! brokers that guarantee per-key ordering preserve chunk order within a
//! file; also the field consumers dedupe chunks on together with
//! `chunk_index`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Stable identity of a tracked file: path + size + content hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileFingerprint(String);

impl FileFingerprint {
    /// Derives a fingerprint from the file's absolute path, size, and
    /// whole-file hash. Two files at different paths with identical content
    /// get different fingerprints, matching the broker-key requirement that
    /// the fingerprint track the file's location, not only its bytes.
    pub fn new(path: &Path, size: u64, file_hash: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(size.to_le_bytes());
        hasher.update(file_hash.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Returns the fingerprint as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn same_inputs_produce_same_fingerprint() {
        let path = PathBuf::from("/watched/a.txt");
        let a = FileFingerprint::new(&path, 10, "abc");
        let b = FileFingerprint::new(&path, 10, "abc");
        assert_eq!(a, b);
    }

    #[test]
    fn different_paths_produce_different_fingerprints() {
        let a = FileFingerprint::new(&PathBuf::from("/watched/a.txt"), 10, "abc");
        let b = FileFingerprint::new(&PathBuf::from("/watched/b.txt"), 10, "abc");
        assert_ne!(a, b);
    }

    #[test]
    fn different_hash_produces_different_fingerprint() {
        let path = PathBuf::from("/watched/a.txt");
        let a = FileFingerprint::new(&path, 10, "abc");
        let b = FileFingerprint::new(&path, 10, "def");
        assert_ne!(a, b);
    }
}
