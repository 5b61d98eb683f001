// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Kafka Producer Adapter
//!
//! Wraps `rdkafka`'s `ThreadedProducer`, which already runs its own
//! background polling thread and services delivery callbacks without the
//! core needing to call `poll` itself -- `poll` here is a courtesy no-op
//! kept to satisfy the port, not a required call.
//!
//! `producer_config_path` is a `.properties`-style file with `[section]`
//! headers: a `[cluster]` section shared by every client, merged with a
//! `[producer]` section whose keys are passed straight through to
//! `rdkafka::ClientConfig`, mirroring the reference implementation's
//! grouped config-file convention (`cluster` / `producer` / `consumer`
//! sections feeding distinct client configs from one file).

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::producer::{BaseRecord, DeliveryResult, Producer, ProducerContext, ThreadedProducer};
use rdkafka::ClientContext;

use uploader_domain::error::UploaderError;
use uploader_domain::services::producer_client::{
    DeliveryCallback, DeliveryMetadata, DeliveryOutcome, ProducerClient, ProducerMessage,
};

/// Parses a `.properties`-style file into `[cluster]` and `[producer]`
/// section maps. Lines starting with `#` or `;` are comments; blank lines
/// are ignored.
fn parse_sections(contents: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current = String::from("default");

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            current = name.trim().to_string();
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            sections
                .entry(current.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    sections
}

/// Builds an `rdkafka::ClientConfig` by merging the `[cluster]` section
/// (bootstrap servers, security settings shared by every client) with the
/// `[producer]` section (producer-specific overrides).
fn load_producer_config(path: &Path) -> Result<ClientConfig, UploaderError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| UploaderError::Configuration(format!("reading producer config {}: {e}", path.display())))?;
    let sections = parse_sections(&contents);

    let mut config = ClientConfig::new();
    if let Some(cluster) = sections.get("cluster") {
        for (key, value) in cluster {
            config.set(key, value);
        }
    }
    if let Some(producer) = sections.get("producer") {
        for (key, value) in producer {
            config.set(key, value);
        }
    }
    Ok(config)
}

/// Routes each delivery report to the originating callback, keyed by a
/// caller-supplied opaque token carried through `BaseRecord::delivery_opaque`.
struct CallbackContext;

impl ClientContext for CallbackContext {}

impl ProducerContext for CallbackContext {
    type DeliveryOpaque = Box<DeliveryCallback>;

    fn delivery(&self, result: &DeliveryResult<'_>, delivery_opaque: Self::DeliveryOpaque) {
        let outcome = match result {
            Ok(msg) => DeliveryOutcome::Success(DeliveryMetadata {
                topic: msg.topic().to_string(),
                partition: msg.partition(),
                offset: msg.offset(),
            }),
            Err((err, _msg)) => DeliveryOutcome::Failure(UploaderError::ProducerPermanent(err.to_string())),
        };
        (*delivery_opaque)(outcome);
    }
}

/// `ProducerClient` adapter backed by `rdkafka::producer::ThreadedProducer`.
pub struct KafkaProducerClient {
    producer: ThreadedProducer<CallbackContext>,
}

impl KafkaProducerClient {
    pub fn new(producer_config_path: &Path) -> Result<Self, UploaderError> {
        let config = load_producer_config(producer_config_path)?;
        let producer: ThreadedProducer<CallbackContext> = config
            .create_with_context(CallbackContext)
            .map_err(|e: KafkaError| UploaderError::Configuration(format!("creating kafka producer: {e}")))?;
        Ok(Self { producer })
    }
}

impl ProducerClient for KafkaProducerClient {
    fn produce(&self, message: ProducerMessage, on_delivery: DeliveryCallback) -> Result<(), UploaderError> {
        let record = BaseRecord::with_opaque_to(&message.topic, Box::new(on_delivery))
            .key(&message.key)
            .payload(&message.value);

        if let Err((err, record)) = self.producer.send(record) {
            // rdkafka hands the opaque back on immediate send failure (e.g. queue
            // full). Fire it here and return Ok: the callback has already fired
            // exactly once, so the caller must not fire a second one on Err.
            let callback = record.delivery_opaque;
            (*callback)(DeliveryOutcome::Failure(UploaderError::ProducerPermanent(err.to_string())));
        }
        Ok(())
    }

    fn poll(&self, timeout: Duration) {
        self.producer.poll(timeout);
    }

    fn flush(&self, timeout: Duration) -> Result<(), UploaderError> {
        self.producer
            .flush(timeout)
            .map_err(|e| UploaderError::ProducerPermanent(format!("flush failed: {e}")))
    }

    fn close(&self) {
        self.producer.flush(Duration::from_secs(30)).ok();
    }
}
