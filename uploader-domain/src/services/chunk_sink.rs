// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Sink Port
//!
//! The domain-facing interface to the bounded chunk queue. `UploadFile`
//! pushes `Chunk` descriptors through a `ChunkSink` without knowing how the
//! queue is implemented or how full it is; the concrete bounded,
//! blocking-on-full queue lives in the infrastructure layer, backed by
//! `crossbeam`.

use crate::error::UploaderError;
use crate::value_objects::Chunk;

/// A destination for chunk descriptors, blocking the calling thread when at
/// capacity. This is the backpressure boundary referenced throughout the
/// scheduling design: a full sink causes `UploadFile::emit_chunks` to block,
/// which in turn throttles the control loop's scan cadence.
pub trait ChunkSink: Send + Sync {
    /// Pushes one chunk, blocking until there is room. Returns an error only
    /// if the sink has been permanently closed out from under the caller,
    /// which should not happen during normal operation.
    fn push(&self, chunk: Chunk) -> Result<(), UploaderError>;
}
