// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Producer Adapters
//!
//! Concrete implementations of `uploader_domain::ProducerClient`. The
//! in-memory adapter is always available and backs both the integration
//! test suite and a `--producer=in-memory` demo mode; the Kafka adapter is
//! gated behind the `kafka` feature since it pulls in a system librdkafka.

pub mod in_memory;

#[cfg(feature = "kafka")]
pub mod kafka;

pub use in_memory::InMemoryProducerClient;
