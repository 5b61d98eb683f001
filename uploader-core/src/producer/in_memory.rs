// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # In-Memory Producer Client
//!
//! A test-and-demo `ProducerClient` that "delivers" every message
//! immediately, from the calling thread, recording it for later
//! inspection. This is the adapter the integration test suite drives the
//! control loop against; it has no broker, no network, and no internal
//! thread of its own, so `poll` is a no-op and `flush`/`close` return
//! immediately.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use uploader_domain::error::UploaderError;
use uploader_domain::services::producer_client::{
    DeliveryCallback, DeliveryMetadata, DeliveryOutcome, ProducerClient, ProducerMessage,
};

/// One message captured by the in-memory client, for test assertions.
#[derive(Debug, Clone)]
pub struct DeliveredMessage {
    pub topic: String,
    pub key: String,
    pub value: Vec<u8>,
    pub offset: i64,
}

/// Records every produced message and immediately reports success.
/// Construct with [`InMemoryProducerClient::failing`] to simulate a
/// permanent delivery failure instead, for exercising the core's
/// `Failed`-state handling without a real broker.
pub struct InMemoryProducerClient {
    delivered: Mutex<Vec<DeliveredMessage>>,
    next_offset: AtomicI64,
    fail_all: bool,
}

impl InMemoryProducerClient {
    pub fn new() -> Self {
        Self { delivered: Mutex::new(Vec::new()), next_offset: AtomicI64::new(0), fail_all: false }
    }

    /// A client that reports every `produce` call as a permanent failure,
    /// for testing the `ProducerPermanent` / `Failed` path.
    pub fn failing() -> Self {
        Self { delivered: Mutex::new(Vec::new()), next_offset: AtomicI64::new(0), fail_all: true }
    }

    pub fn delivered(&self) -> Vec<DeliveredMessage> {
        self.delivered.lock().expect("in-memory producer lock poisoned").clone()
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.lock().expect("in-memory producer lock poisoned").len()
    }
}

impl Default for InMemoryProducerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ProducerClient for InMemoryProducerClient {
    fn produce(&self, message: ProducerMessage, on_delivery: DeliveryCallback) -> Result<(), UploaderError> {
        if self.fail_all {
            on_delivery(DeliveryOutcome::Failure(UploaderError::ProducerPermanent(
                "in-memory client configured to fail".to_string(),
            )));
            return Ok(());
        }

        let offset = self.next_offset.fetch_add(1, Ordering::AcqRel);
        self.delivered.lock().expect("in-memory producer lock poisoned").push(DeliveredMessage {
            topic: message.topic.clone(),
            key: message.key,
            value: message.value,
            offset,
        });
        on_delivery(DeliveryOutcome::Success(DeliveryMetadata {
            topic: message.topic,
            partition: 0,
            offset,
        }));
        Ok(())
    }

    fn poll(&self, _timeout: Duration) {}

    fn flush(&self, _timeout: Duration) -> Result<(), UploaderError> {
        Ok(())
    }

    fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produce_delivers_synchronously_in_order() {
        let client = InMemoryProducerClient::new();

        for i in 0..3 {
            client
                .produce(
                    ProducerMessage { topic: "t".into(), key: "k".into(), value: vec![i] },
                    Box::new(|outcome| {
                        assert!(matches!(outcome, DeliveryOutcome::Success(_)));
                    }),
                )
                .unwrap();
        }

        let messages = client.delivered();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].offset, 0);
        assert_eq!(messages[2].offset, 2);
    }

    #[test]
    fn failing_client_reports_permanent_failure() {
        use std::sync::atomic::AtomicBool;
        use std::sync::Arc;

        let client = InMemoryProducerClient::failing();
        let saw_failure = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&saw_failure);
        client
            .produce(
                ProducerMessage { topic: "t".into(), key: "k".into(), value: vec![] },
                Box::new(move |outcome| {
                    flag.store(matches!(outcome, DeliveryOutcome::Failure(_)), Ordering::SeqCst);
                }),
            )
            .unwrap();
        assert!(saw_failure.load(Ordering::SeqCst));
        assert_eq!(client.delivered_count(), 0);
    }
}
