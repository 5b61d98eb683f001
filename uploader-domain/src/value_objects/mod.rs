// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Value objects: immutable, self-validating types with no identity of their
//! own, compared by value.

pub mod admit_pattern;
pub mod chunk;
pub mod chunk_size;
pub mod fingerprint;
pub mod worker_count;

pub use admit_pattern::AdmitPattern;
pub use chunk::{Chunk, SerializedChunk};
pub use chunk_size::ChunkSize;
pub use fingerprint::FileFingerprint;
pub use worker_count::WorkerCount;
