// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # UploadFile Entity
//!
//! `UploadFile` is the state machine for one tracked source file, from first
//! discovery through every chunk being acknowledged by the broker. Unlike a
//! value object, an `UploadFile` has identity (its path) and mutable state
//! that evolves over the file's lifetime; that state is touched concurrently
//! by the control loop (scheduling `emit_chunks`) and by delivery-callback
//! threads (`on_ack`), so the counters are atomics and the phase transition
//! is guarded by a short-lived mutex that is never held across a blocking
//! queue push.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

use sha2::{Digest, Sha256};

use crate::error::UploaderError;
use crate::services::chunk_sink::ChunkSink;
use crate::services::producer_client::DeliveryOutcome;
use crate::value_objects::{Chunk, ChunkSize, FileFingerprint};

/// Information computed once a file has been successfully read in full:
/// size, whole-file hash, the number of chunks it splits into, and the
/// per-chunk hashes computed during that same pass. Immutable once set.
#[derive(Debug, Clone)]
struct HashedInfo {
    fingerprint: FileFingerprint,
    size: u64,
    file_hash: String,
    chunk_count: u64,
    chunk_hashes: Vec<String>,
}

/// The lifecycle state of an `UploadFile`.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
    Registered,
    Hashed,
    InProgress,
    FullyEnqueued,
    FullyAcked,
    Failed(UploaderError),
}

/// One tracked source file.
pub struct UploadFile {
    /// Absolute, resolved path on disk.
    path: PathBuf,
    /// Path of the containing directory, relative to the watched root.
    subdir_path: PathBuf,
    filename: String,
    /// Whether this file was admitted for upload, or merely recorded as
    /// having pre-existed the run (see `upload_existing` in the run
    /// configuration).
    to_upload: bool,
    chunk_size: ChunkSize,
    hashed: OnceLock<HashedInfo>,
    state: Mutex<UploadState>,
    next_chunk_to_enqueue: AtomicU64,
    acked_chunks: AtomicU64,
}

impl UploadFile {
    /// Registers a newly discovered file. `path` must already be resolved to
    /// an absolute path; `subdir_path` is its parent directory relative to
    /// the watched root, used to reconstruct the chunk's location without
    /// storing the watched root on every entry.
    pub fn new(
        path: PathBuf,
        subdir_path: PathBuf,
        filename: String,
        to_upload: bool,
        chunk_size: ChunkSize,
    ) -> Self {
        Self {
            path,
            subdir_path,
            filename,
            to_upload,
            chunk_size,
            hashed: OnceLock::new(),
            state: Mutex::new(UploadState::Registered),
            next_chunk_to_enqueue: AtomicU64::new(0),
            acked_chunks: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn to_upload(&self) -> bool {
        self.to_upload
    }

    /// Current lifecycle state, cloned out from behind the lock.
    pub fn state(&self) -> UploadState {
        self.state.lock().expect("upload_file state mutex poisoned").clone()
    }

    pub fn fingerprint(&self) -> Option<&FileFingerprint> {
        self.hashed.get().map(|h| &h.fingerprint)
    }

    pub fn size(&self) -> Option<u64> {
        self.hashed.get().map(|h| h.size)
    }

    pub fn chunk_count(&self) -> Option<u64> {
        self.hashed.get().map(|h| h.chunk_count)
    }

    pub fn file_hash(&self) -> Option<&str> {
        self.hashed.get().map(|h| h.file_hash.as_str())
    }

    /// True once `Hashed` but no chunk has been enqueued yet -- the
    /// condition the scheduler uses to pick a file that "needs its first
    /// chunk".
    pub fn needs_first_chunk(&self) -> bool {
        matches!(self.state(), UploadState::Hashed)
            && self.next_chunk_to_enqueue.load(Ordering::Acquire) == 0
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self.state(), UploadState::InProgress)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state(), UploadState::FullyAcked | UploadState::Failed(_))
    }

    /// Attempts to open the file and, on success, streams it once to compute
    /// `size`, `file_hash`, `chunk_count`, and the per-chunk hashes used to
    /// validate each `Chunk` at send time. A sharing or permission error is
    /// reported as `FileNotReady` so the scanner retries on a later tick;
    /// any other I/O failure propagates unchanged.
    ///
    /// Idempotent: a file that is already `Hashed` (or further along) is a
    /// no-op success, so the scanner may call `prepare` on every tick
    /// without guarding against having already hashed the file.
    pub fn prepare(&self) -> Result<(), UploaderError> {
        if self.hashed.get().is_some() {
            return Ok(());
        }

        let mut file = File::open(&self.path)?;
        let size = file.metadata()?.len();
        let chunk_count = self.chunk_size.chunks_needed_for_file(size);

        let mut file_hasher = Sha256::new();
        let mut chunk_hashes = Vec::with_capacity(chunk_count as usize);
        for chunk_index in 0..chunk_count {
            let (_, length) = self.chunk_size.range_for_chunk(chunk_index, size);
            let mut buf = vec![0u8; length as usize];
            if length > 0 {
                file.read_exact(&mut buf)?;
            }
            let mut chunk_hasher = Sha256::new();
            chunk_hasher.update(&buf);
            chunk_hashes.push(hex::encode(chunk_hasher.finalize()));
            file_hasher.update(&buf);
        }

        let file_hash = hex::encode(file_hasher.finalize());
        let fingerprint = FileFingerprint::new(&self.path, size, &file_hash);

        // A concurrent caller may have already hashed this file; in that
        // case our freshly computed info is simply discarded.
        let _ = self.hashed.set(HashedInfo { fingerprint, size, file_hash, chunk_count, chunk_hashes });

        let mut state = self.state.lock().expect("upload_file state mutex poisoned");
        if matches!(*state, UploadState::Registered) {
            *state = UploadState::Hashed;
        }
        Ok(())
    }

    /// Enqueues up to `budget` consecutive chunks starting at
    /// `next_chunk_to_enqueue`, blocking on `sink` when it is at capacity.
    /// The cursor is advanced with a single atomic compare-and-swap *before*
    /// the corresponding chunk is pushed, so a concurrent caller can never
    /// observe or emit the same index twice, and the push itself happens
    /// with no lock held -- a full queue blocks this thread without
    /// blocking `on_ack` on any other.
    pub fn emit_chunks(&self, sink: &dyn ChunkSink, budget: u64) -> Result<u64, UploaderError> {
        let Some(hashed) = self.hashed.get() else {
            return Ok(0);
        };

        let mut emitted = 0u64;
        for _ in 0..budget {
            let reserved = self.next_chunk_to_enqueue.fetch_update(
                Ordering::AcqRel,
                Ordering::Acquire,
                |cur| if cur < hashed.chunk_count { Some(cur + 1) } else { None },
            );
            let chunk_index = match reserved {
                Ok(prev) => prev,
                Err(_) => break,
            };

            self.transition(UploadState::Hashed, UploadState::InProgress);

            let (offset, length) = self.chunk_size.range_for_chunk(chunk_index, hashed.size);
            let chunk = Chunk::new(
                hashed.fingerprint.clone(),
                self.subdir_path.clone(),
                self.filename.clone(),
                chunk_index,
                hashed.chunk_count,
                offset,
                length,
                hashed.chunk_hashes[chunk_index as usize].clone(),
                hashed.file_hash.clone(),
            )?;

            sink.push(chunk)?;
            emitted += 1;

            if chunk_index + 1 == hashed.chunk_count {
                self.transition(UploadState::InProgress, UploadState::FullyEnqueued);
            }
        }
        Ok(emitted)
    }

    /// Applies the result of a delivery callback. On success, increments
    /// `acked_chunks` and transitions to `FullyAcked` once every chunk has
    /// been acknowledged. On permanent failure, transitions to `Failed` and
    /// records the error, regardless of how many chunks had already been
    /// acknowledged.
    pub fn on_ack(&self, outcome: DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Success(_) => {
                let acked = self.acked_chunks.fetch_add(1, Ordering::AcqRel) + 1;
                if let Some(hashed) = self.hashed.get() {
                    if acked >= hashed.chunk_count {
                        let mut state = self.state.lock().expect("upload_file state mutex poisoned");
                        if !matches!(*state, UploadState::Failed(_)) {
                            *state = UploadState::FullyAcked;
                        }
                    }
                }
            }
            DeliveryOutcome::Failure(err) => {
                let mut state = self.state.lock().expect("upload_file state mutex poisoned");
                *state = UploadState::Failed(err);
            }
        }
    }

    /// Human-readable progress string, e.g. `"3/10 chunks acked"`.
    pub fn status_msg(&self) -> String {
        match self.state() {
            UploadState::Registered => format!("{}: discovered, awaiting readability", self.filename),
            UploadState::Hashed => format!("{}: hashed, awaiting first chunk", self.filename),
            UploadState::InProgress | UploadState::FullyEnqueued => {
                let acked = self.acked_chunks.load(Ordering::Acquire);
                let total = self.hashed.get().map(|h| h.chunk_count).unwrap_or(0);
                format!("{}: {}/{} chunks acked", self.filename, acked, total)
            }
            UploadState::FullyAcked => format!("{}: complete", self.filename),
            UploadState::Failed(ref err) => format!("{}: failed ({err})", self.filename),
        }
    }

    fn transition(&self, from: UploadState, to: UploadState) {
        let mut state = self.state.lock().expect("upload_file state mutex poisoned");
        if *state == from {
            *state = to;
        }
    }
}
