// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Value Object
//!
//! `Chunk` identifies one slice of one tracked file: which file it belongs
//! to, where the slice falls, and the hash that slice is expected to produce
//! when read. It does not carry its bytes in memory between creation and
//! send -- it is a lightweight,
//! cloneable descriptor that sits in the bounded queue; its payload is read
//! from disk lazily, at serialize time, by the worker that dequeues it. This
//! keeps queued-but-not-yet-sent chunks cheap and bounds worst-case memory to
//! `queue_capacity * chunk_size` rather than `file_count * file_size`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::UploaderError;
use crate::value_objects::fingerprint::FileFingerprint;

/// A single slice of a tracked file, identified by file fingerprint and
/// position, ready to be read from disk and produced to the message bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    file_fingerprint: FileFingerprint,
    subdir_path: PathBuf,
    filename: String,
    chunk_index: u64,
    chunk_count: u64,
    offset: u64,
    length: u64,
    chunk_hash: String,
    file_hash: String,
}

/// The bytes and metadata of a chunk, read from disk and ready to hand to a
/// producer client. Produced by `Chunk::serialize`.
#[derive(Debug, Clone)]
pub struct SerializedChunk {
    pub key: String,
    pub bytes: Vec<u8>,
    pub chunk_index: u64,
    pub chunk_count: u64,
    pub filename: String,
}

impl Chunk {
    /// Builds a new `Chunk` descriptor. `chunk_hash` is the hash the bytes at
    /// `[offset, offset+length)` are expected to produce; it is computed by
    /// the caller (typically during file admission, while hashing the whole
    /// file) and re-verified lazily in `serialize`.
    ///
    /// Rejects a chunk whose index is not less than its own count, and a
    /// chunk of zero length unless it is the file's sole chunk (the
    /// zero-byte-file case, where `chunk_count == 1`).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        file_fingerprint: FileFingerprint,
        subdir_path: PathBuf,
        filename: String,
        chunk_index: u64,
        chunk_count: u64,
        offset: u64,
        length: u64,
        chunk_hash: String,
        file_hash: String,
    ) -> Result<Self, UploaderError> {
        if chunk_index >= chunk_count {
            return Err(UploaderError::InvalidChunk(format!(
                "chunk_index {chunk_index} out of bounds for chunk_count {chunk_count}"
            )));
        }
        if length == 0 && chunk_count != 1 {
            return Err(UploaderError::InvalidChunk(
                "zero-length chunk is only valid as a file's sole chunk".to_string(),
            ));
        }
        Ok(Self {
            file_fingerprint,
            subdir_path,
            filename,
            chunk_index,
            chunk_count,
            offset,
            length,
            chunk_hash,
            file_hash,
        })
    }

    pub fn file_fingerprint(&self) -> &FileFingerprint {
        &self.file_fingerprint
    }

    pub fn chunk_index(&self) -> u64 {
        self.chunk_index
    }

    pub fn chunk_count(&self) -> u64 {
        self.chunk_count
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn is_final(&self) -> bool {
        self.chunk_index + 1 == self.chunk_count
    }

    /// Reads `[offset, offset+length)` from `file_root.join(subdir_path).join(filename)`,
    /// recomputes its SHA-256, and compares it against `chunk_hash`. Returns
    /// `UploaderError::ChunkDataCorrupted` on mismatch and
    /// `UploaderError::FileDisappeared` if the file is gone or has shrunk
    /// below the expected range -- both cases mean the file changed
    /// underneath the uploader after admission.
    pub fn serialize(&self, file_root: &Path) -> Result<SerializedChunk, UploaderError> {
        let path = file_root.join(&self.subdir_path).join(&self.filename);
        let mut file = File::open(&path)?;
        let mut buf = vec![0u8; self.length as usize];
        if self.length > 0 {
            file.seek(SeekFrom::Start(self.offset))?;
            file.read_exact(&mut buf)?;
        }

        let mut hasher = Sha256::new();
        hasher.update(&buf);
        let actual_hash = hex::encode(hasher.finalize());
        if actual_hash != self.chunk_hash {
            return Err(UploaderError::ChunkDataCorrupted(format!(
                "{}: chunk {} hash mismatch (expected {}, got {})",
                self.filename, self.chunk_index, self.chunk_hash, actual_hash
            )));
        }

        Ok(SerializedChunk {
            key: self.file_fingerprint.to_string(),
            bytes: buf,
            chunk_index: self.chunk_index,
            chunk_count: self.chunk_count,
            filename: self.filename.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn make_fingerprint() -> FileFingerprint {
        FileFingerprint::new(&PathBuf::from("a.txt"), 5, "filehash")
    }

    fn hash_of(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    #[test]
    fn rejects_out_of_bounds_index() {
        let result = Chunk::new(
            make_fingerprint(),
            PathBuf::new(),
            "a.txt".to_string(),
            2,
            2,
            0,
            5,
            "deadbeef".to_string(),
            "filehash".to_string(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_zero_length_when_not_sole_chunk() {
        let result = Chunk::new(
            make_fingerprint(),
            PathBuf::new(),
            "a.txt".to_string(),
            0,
            2,
            0,
            0,
            "deadbeef".to_string(),
            "filehash".to_string(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn allows_zero_length_sole_chunk() {
        let result = Chunk::new(
            make_fingerprint(),
            PathBuf::new(),
            "empty.txt".to_string(),
            0,
            1,
            0,
            0,
            hash_of(&[]),
            "filehash".to_string(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn serialize_reads_correct_range_and_verifies_hash() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::File::create(&path).unwrap().write_all(b"hello world").unwrap();

        let slice = b"world";
        let chunk = Chunk::new(
            make_fingerprint(),
            PathBuf::new(),
            "a.txt".to_string(),
            1,
            2,
            6,
            5,
            hash_of(slice),
            "filehash".to_string(),
        )
        .unwrap();

        let serialized = chunk.serialize(dir.path()).unwrap();
        assert_eq!(serialized.bytes, slice);
        assert!(chunk.is_final());
    }

    #[test]
    fn serialize_detects_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::File::create(&path).unwrap().write_all(b"hello world").unwrap();

        let chunk = Chunk::new(
            make_fingerprint(),
            PathBuf::new(),
            "a.txt".to_string(),
            0,
            1,
            0,
            11,
            "0000000000000000000000000000000000000000000000000000000000000000".to_string(),
            "filehash".to_string(),
        )
        .unwrap();

        let result = chunk.serialize(dir.path());
        assert!(matches!(result, Err(UploaderError::ChunkDataCorrupted(_))));
    }

    #[test]
    fn serialize_reports_missing_file_as_disappeared() {
        let dir = tempdir().unwrap();
        let chunk = Chunk::new(
            make_fingerprint(),
            PathBuf::new(),
            "missing.txt".to_string(),
            0,
            1,
            0,
            5,
            "deadbeef".to_string(),
            "filehash".to_string(),
        )
        .unwrap();

        let result = chunk.serialize(dir.path());
        assert!(matches!(result, Err(UploaderError::FileDisappeared(_))));
    }
}
