// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Size Value Object
//!
//! A type-safe representation of the number of bytes per chunk. Chunk size
//! is a single configured value shared by every file in a run (unlike the
//! teacher's per-file adaptive sizing); this value object exists to keep
//! `usize` byte counts from being confused with other counts and to centralize
//! bounds validation and the `ceil(size / chunk_size)` chunk-count arithmetic.
//!
//! ## Chunk Size Constraints
//!
//! - **Minimum** (1 byte): a zero-byte chunk size would divide by zero when
//!   computing chunk counts.
//! - **Maximum** (512MB): bounds the amount of memory a single in-flight
//!   chunk read can consume.
//! - **Default** (1MB): matches `RUN_OPT_CONST.DEFAULT_CHUNK_SIZE` from the
//!   reference implementation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::UploaderError;

/// Validated chunk size, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkSize {
    bytes: u64,
}

impl ChunkSize {
    /// Minimum chunk size (1 byte).
    pub const MIN_SIZE: u64 = 1;

    /// Maximum chunk size (512MB).
    pub const MAX_SIZE: u64 = 512 * 1024 * 1024;

    /// Default chunk size (1MB), matching the reference uploader's default.
    pub const DEFAULT_SIZE: u64 = 1024 * 1024;

    /// Creates a new `ChunkSize`, rejecting values outside `[MIN_SIZE,
    /// MAX_SIZE]`.
    pub fn new(bytes: u64) -> Result<Self, UploaderError> {
        if bytes < Self::MIN_SIZE {
            return Err(UploaderError::Configuration(format!(
                "chunk_size must be at least {} byte(s), got {bytes}",
                Self::MIN_SIZE
            )));
        }
        if bytes > Self::MAX_SIZE {
            return Err(UploaderError::Configuration(format!(
                "chunk_size must not exceed {} bytes, got {bytes}",
                Self::MAX_SIZE
            )));
        }
        Ok(Self { bytes })
    }

    /// Returns the chunk size in bytes.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Computes `ceil(file_size / chunk_size)`, the number of chunks a file
    /// of the given size splits into. A zero-byte file always yields exactly
    /// one (empty) chunk -- see `UploadFile::prepare` for the admitted
    /// policy.
    pub fn chunks_needed_for_file(&self, file_size: u64) -> u64 {
        if file_size == 0 {
            return 1;
        }
        file_size.div_ceil(self.bytes)
    }

    /// Computes the byte offset and length of the chunk at `chunk_index`
    /// within a file of `file_size` bytes.
    pub fn range_for_chunk(&self, chunk_index: u64, file_size: u64) -> (u64, u64) {
        let offset = chunk_index * self.bytes;
        let remaining = file_size.saturating_sub(offset);
        let length = remaining.min(self.bytes);
        (offset, length)
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self { bytes: Self::DEFAULT_SIZE }
    }
}

impl fmt::Display for ChunkSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bytes >= 1024 * 1024 {
            write!(f, "{:.1}MB", self.bytes as f64 / (1024.0 * 1024.0))
        } else if self.bytes >= 1024 {
            write!(f, "{:.1}KB", self.bytes as f64 / 1024.0)
        } else {
            write!(f, "{}B", self.bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero() {
        assert!(ChunkSize::new(0).is_err());
    }

    #[test]
    fn rejects_too_large() {
        assert!(ChunkSize::new(ChunkSize::MAX_SIZE + 1).is_err());
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_chunk() {
        let cs = ChunkSize::new(524_288).unwrap();
        assert_eq!(cs.chunks_needed_for_file(1_048_576), 2);
    }

    #[test]
    fn partial_final_chunk_counted() {
        let cs = ChunkSize::new(524_288).unwrap();
        // 1,048,577 bytes -> 2 full chunks + 1 byte
        assert_eq!(cs.chunks_needed_for_file(1_048_577), 3);
    }

    #[test]
    fn zero_byte_file_yields_one_chunk() {
        let cs = ChunkSize::default();
        assert_eq!(cs.chunks_needed_for_file(0), 1);
    }

    #[test]
    fn range_for_last_short_chunk() {
        let cs = ChunkSize::new(524_288).unwrap();
        let (offset, length) = cs.range_for_chunk(2, 1_048_577);
        assert_eq!(offset, 1_048_576);
        assert_eq!(length, 1);
    }

    #[test]
    fn display_formats_megabytes() {
        assert_eq!(format!("{}", ChunkSize::default()), "1.0MB");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// `chunks_needed_for_file` matches `ceil(file_size / chunk_size)`,
        /// with the zero-byte-file special case always yielding exactly one.
        #[test]
        fn chunk_count_matches_ceiling_division(
            bytes in ChunkSize::MIN_SIZE..=ChunkSize::MAX_SIZE,
            file_size in 0u64..u32::MAX as u64,
        ) {
            let cs = ChunkSize::new(bytes).unwrap();
            let needed = cs.chunks_needed_for_file(file_size);
            if file_size == 0 {
                prop_assert_eq!(needed, 1);
            } else {
                prop_assert_eq!(needed, file_size.div_ceil(bytes));
            }
        }

        /// Every chunk's range tiles `[0, file_size)` with no gap or
        /// overlap, and only the last chunk may be shorter than `bytes`.
        /// The one zero-byte-file chunk is the exception: it covers nothing.
        #[test]
        fn ranges_tile_the_file_without_gaps(
            bytes in ChunkSize::MIN_SIZE..=1_000_000u64,
            file_size in 0u64..5_000_000u64,
        ) {
            let cs = ChunkSize::new(bytes).unwrap();
            let needed = cs.chunks_needed_for_file(file_size);
            let mut covered = 0u64;
            for index in 0..needed {
                let (offset, length) = cs.range_for_chunk(index, file_size);
                prop_assert_eq!(offset, covered);
                if index + 1 < needed {
                    prop_assert_eq!(length, bytes);
                } else {
                    prop_assert!(length <= bytes);
                }
                covered += length;
            }
            prop_assert_eq!(covered, file_size);
        }
    }
}
