// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Domain services: ports implemented by the infrastructure layer, and pure
//! domain logic that doesn't belong to a single value object or entity.

pub mod chunk_sink;
pub mod producer_client;

pub use chunk_sink::ChunkSink;
pub use producer_client::{
    DeliveryCallback, DeliveryMetadata, DeliveryOutcome, ProducerClient, ProducerMessage,
};
