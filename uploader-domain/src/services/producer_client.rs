// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Producer Client Port
//!
//! A narrow abstraction over a message-bus producer. Workers call `produce`
//! from their own thread and rely on `poll` being called regularly to drain
//! delivery callbacks -- this is part of the contract, not an incidental
//! detail of any one backend. The core never retries a failed send itself;
//! retry policy belongs entirely inside the concrete client (the Kafka
//! adapter delegates to librdkafka's internal retry queue, for instance).

use std::time::Duration;

use crate::error::UploaderError;

/// Metadata about a successfully delivered message, handed to the delivery
/// callback.
#[derive(Debug, Clone)]
pub struct DeliveryMetadata {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// The outcome reported to a delivery callback: either the broker
/// acknowledged the message, or delivery failed permanently.
#[derive(Debug, Clone)]
pub enum DeliveryOutcome {
    Success(DeliveryMetadata),
    Failure(UploaderError),
}

/// A delivery callback, invoked from a client-owned thread when the broker
/// acknowledges a send or raises a permanent error. Must be `Send` since it
/// crosses from the worker thread that called `produce` into whatever thread
/// the client uses to service its internal event loop.
pub type DeliveryCallback = Box<dyn FnOnce(DeliveryOutcome) + Send>;

/// A single message to be handed to the bus: a topic, a partition-routing
/// key (the file fingerprint, so all chunks of one file land on one
/// partition and keep their order), and the chunk payload.
pub struct ProducerMessage {
    pub topic: String,
    pub key: String,
    pub value: Vec<u8>,
}

/// Narrow producer-client abstraction. Implementations wrap a concrete
/// message-bus client (Kafka, or an in-memory test double).
pub trait ProducerClient: Send + Sync {
    /// Queues `message` for asynchronous delivery. Once `produce` accepts
    /// the message, `on_delivery` fires exactly once -- whether the broker
    /// acknowledges the send or a permanent error occurs -- and that is the
    /// only place the outcome is reported; an `Ok` return must never be
    /// followed by a second call reporting the same outcome through `Err`.
    /// An `Err` return means the message was rejected before being queued
    /// and `on_delivery` will never fire for it. Returns immediately; never
    /// blocks on broker round-trip latency.
    fn produce(
        &self,
        message: ProducerMessage,
        on_delivery: DeliveryCallback,
    ) -> Result<(), UploaderError>;

    /// Services pending delivery callbacks for up to `timeout`. Must be
    /// called regularly by every thread that calls `produce`, or delivery
    /// callbacks never fire.
    fn poll(&self, timeout: Duration);

    /// Blocks until every outstanding send has fired its callback, or until
    /// `timeout` elapses. `Duration::MAX` signals an unbounded wait, which
    /// callers rely on during the shutdown drain.
    fn flush(&self, timeout: Duration) -> Result<(), UploaderError>;

    /// Releases broker resources. Called once, after the final `flush`.
    fn close(&self);
}
