// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Uploader Domain
//!
//! The business logic of the directory-watching chunked uploader: what a
//! chunk is, what it means for a file to be fully acknowledged, and how a
//! file is split and scheduled. This crate has no knowledge of threads,
//! queues, file-system polling, or a specific message broker -- those are
//! infrastructure concerns that depend on this crate's ports, not the other
//! way around.
//!
//! ## Module Structure
//!
//! - [`value_objects`]: immutable, self-validating types with no identity
//!   (`Chunk`, `ChunkSize`, `WorkerCount`, `FileFingerprint`, `AdmitPattern`).
//! - [`entities`]: objects with identity and a mutable lifecycle
//!   (`UploadFile`).
//! - [`aggregates`]: consistency boundaries over a collection of entities
//!   (`Registry`).
//! - [`services`]: ports implemented by the infrastructure layer
//!   (`ChunkSink`, `ProducerClient`).
//! - [`error`]: the domain error enum, `UploaderError`.

pub mod aggregates;
pub mod entities;
pub mod error;
pub mod services;
pub mod value_objects;

pub use aggregates::Registry;
pub use entities::{UploadFile, UploadState};
pub use error::UploaderError;
pub use services::{ChunkSink, ProducerClient};
pub use value_objects::{AdmitPattern, Chunk, ChunkSize, FileFingerprint, WorkerCount};
