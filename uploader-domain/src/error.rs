// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Uploader Error System
//!
//! Domain-specific errors for the directory-watching chunked uploader. Each
//! variant corresponds to one of the error kinds named in the error-handling
//! design: a readability probe that isn't ready yet, a file that vanished
//! mid-scan or mid-read, a chunk whose hash no longer matches its bytes, a
//! permanent producer failure, and a fatal startup misconfiguration.
//!
//! ## Policy
//!
//! - `FileNotReady` is retried by the scanner; it is not fatal.
//! - `FileDisappeared` and `ChunkDataCorrupted` move the affected
//!   `UploadFile` to `Failed` without aborting the run.
//! - `ProducerPermanent` surfaces from a delivery callback and also moves the
//!   file to `Failed`.
//! - `Configuration` is fatal at startup, before any thread is spawned.

use thiserror::Error;

/// Domain-specific errors for the uploader.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploaderError {
    /// The readability probe could not open the file yet (sharing violation,
    /// permission denied). The scanner will retry on a later tick.
    #[error("file not ready for reading: {0}")]
    FileNotReady(String),

    /// The file vanished between being discovered and being fully read,
    /// either during the directory walk or during a chunk read.
    #[error("file disappeared: {0}")]
    FileDisappeared(String),

    /// A chunk's freshly computed hash does not match the hash recorded at
    /// discovery time -- the file was modified underneath the uploader.
    #[error("chunk data corrupted: {0}")]
    ChunkDataCorrupted(String),

    /// The producer client reported a permanent delivery failure for one
    /// chunk. The originating file moves to `Failed`.
    #[error("producer permanent failure: {0}")]
    ProducerPermanent(String),

    /// A chunk was constructed with invalid parameters (empty range, zero
    /// length, out-of-bounds index).
    #[error("invalid chunk: {0}")]
    InvalidChunk(String),

    /// A startup configuration value was missing or out of range.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Wraps an I/O failure that doesn't fit one of the more specific
    /// categories above.
    #[error("I/O error: {0}")]
    Io(String),
}

impl UploaderError {
    /// True for errors the scanner should silently retry rather than log as
    /// a failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FileNotReady(_))
    }

    /// True for errors that terminate the affected file's upload.
    pub fn is_fatal_to_file(&self) -> bool {
        matches!(
            self,
            Self::FileDisappeared(_) | Self::ChunkDataCorrupted(_) | Self::ProducerPermanent(_)
        )
    }
}

impl From<std::io::Error> for UploaderError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound => Self::FileDisappeared(err.to_string()),
            ErrorKind::PermissionDenied => Self::FileNotReady(err.to_string()),
            // A `read_exact` that runs out of bytes mid-chunk means the file
            // shrank underneath the uploader after admission -- the same
            // "file changed out from under us" condition as `NotFound`.
            ErrorKind::UnexpectedEof => Self::FileDisappeared(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_not_ready_is_retryable() {
        let err = UploaderError::FileNotReady("locked".into());
        assert!(err.is_retryable());
        assert!(!err.is_fatal_to_file());
    }

    #[test]
    fn corrupted_chunk_is_fatal_to_file() {
        let err = UploaderError::ChunkDataCorrupted("hash mismatch".into());
        assert!(err.is_fatal_to_file());
        assert!(!err.is_retryable());
    }

    #[test]
    fn io_not_found_becomes_file_disappeared() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: UploaderError = io_err.into();
        assert!(matches!(err, UploaderError::FileDisappeared(_)));
    }

    #[test]
    fn io_permission_denied_becomes_not_ready() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked");
        let err: UploaderError = io_err.into();
        assert!(matches!(err, UploaderError::FileNotReady(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn io_unexpected_eof_becomes_file_disappeared() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err: UploaderError = io_err.into();
        assert!(matches!(err, UploaderError::FileDisappeared(_)));
        assert!(err.is_fatal_to_file());
    }
}
