// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Worker Pool
//!
//! N OS threads, each running the take/serialize/produce/poll loop: pull
//! one `QueueItem` off the shared `ChunkQueue`, read its bytes from disk,
//! hand them to the producer client, and keep polling the client while
//! waiting for the next item so delivery callbacks actually fire. A worker
//! never touches the scanner or the control loop directly; its only
//! shared state is the queue (for work) and the registry (to route a
//! delivery outcome back to the `UploadFile` it belongs to).

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use prometheus::IntCounter;
use tracing::{error, trace, warn};

use uploader_domain::aggregates::Registry;
use uploader_domain::services::producer_client::{
    DeliveryCallback, DeliveryOutcome, ProducerClient, ProducerMessage,
};

use crate::chunk_queue::{ChunkQueue, QueueItem};

/// How long a worker waits for the producer client to service pending
/// callbacks between queue takes.
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Spawns and joins the fixed-size pool of worker threads.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `worker_count` threads, each looping until it receives a
    /// `QueueItem::Shutdown` sentinel.
    pub fn spawn(
        worker_count: usize,
        queue: Arc<ChunkQueue>,
        registry: Arc<Registry>,
        producer: Arc<dyn ProducerClient>,
        watched_dir: PathBuf,
        topic: String,
        chunks_acked_total: IntCounter,
    ) -> Self {
        let handles = (0..worker_count)
            .map(|worker_id| {
                let queue = Arc::clone(&queue);
                let registry = Arc::clone(&registry);
                let producer = Arc::clone(&producer);
                let watched_dir = watched_dir.clone();
                let topic = topic.clone();
                let chunks_acked_total = chunks_acked_total.clone();
                thread::Builder::new()
                    .name(format!("uploader-worker-{worker_id}"))
                    .spawn(move || {
                        worker_loop(worker_id, &queue, &registry, producer.as_ref(), &watched_dir, &topic, &chunks_acked_total)
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();
        Self { handles }
    }

    /// Blocks until every worker thread has exited. Workers only exit once
    /// they've each received their own shutdown sentinel.
    pub fn join(self) {
        for handle in self.handles {
            if let Err(panic) = handle.join() {
                error!(?panic, "worker thread panicked");
            }
        }
    }
}

fn worker_loop(
    worker_id: usize,
    queue: &ChunkQueue,
    registry: &Registry,
    producer: &dyn ProducerClient,
    watched_dir: &std::path::Path,
    topic: &str,
    chunks_acked_total: &IntCounter,
) {
    loop {
        let item = match queue.take() {
            Ok(item) => item,
            Err(_) => {
                warn!(worker_id, "chunk queue closed unexpectedly, exiting");
                return;
            }
        };

        match item {
            QueueItem::Shutdown => {
                trace!(worker_id, "received shutdown token");
                return;
            }
            QueueItem::Chunk(chunk) => {
                // Chunk does not expose its subdir_path, so the originating
                // UploadFile is found by fingerprint rather than by
                // reconstructing a full path.
                let upload_file = registry
                    .all_in_order()
                    .into_iter()
                    .find(|f| f.fingerprint() == Some(chunk.file_fingerprint()));

                let serialized = match chunk.serialize(watched_dir) {
                    Ok(serialized) => serialized,
                    Err(err) => {
                        if let Some(file) = &upload_file {
                            file.on_ack(DeliveryOutcome::Failure(err));
                        }
                        continue;
                    }
                };

                let message = ProducerMessage {
                    topic: topic.to_string(),
                    key: serialized.key,
                    value: serialized.bytes,
                };

                let callback_file = upload_file.clone();
                let callback_acked_total = chunks_acked_total.clone();
                let on_delivery: DeliveryCallback = Box::new(move |outcome| {
                    if matches!(outcome, DeliveryOutcome::Success(_)) {
                        callback_acked_total.inc();
                    }
                    if let Some(file) = callback_file {
                        file.on_ack(outcome);
                    }
                });

                // `ProducerClient::produce` fires `on_delivery` exactly once,
                // including on an immediate send failure, so a non-`Ok`
                // return here would double-ack; the callback alone decides
                // the outcome.
                if let Err(err) = producer.produce(message, on_delivery) {
                    error!(worker_id, error = %err, "producer rejected message without firing a delivery callback");
                }
            }
        }

        producer.poll(POLL_TIMEOUT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::InMemoryProducerClient;
    use std::fs;
    use std::io::Write;
    use tempfile::tempdir;
    use uploader_domain::entities::UploadFile;
    use uploader_domain::value_objects::ChunkSize;

    #[test]
    fn worker_drains_chunks_and_acks_originating_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::File::create(&path).unwrap().write_all(b"0123456789abcdef").unwrap();

        let upload_file = UploadFile::new(
            path.clone(),
            PathBuf::new(),
            "a.txt".to_string(),
            true,
            ChunkSize::new(4).unwrap(),
        );
        upload_file.prepare().unwrap();

        let registry = Arc::new(Registry::new());
        let handle = registry.insert_if_absent(path.clone(), upload_file);

        let queue = Arc::new(ChunkQueue::new(8));
        let sink: &dyn uploader_domain::services::ChunkSink = queue.as_ref();
        handle.emit_chunks(sink, 4).unwrap();
        for _ in 0..1 {
            queue.push_shutdown().unwrap();
        }

        let producer: Arc<dyn ProducerClient> = Arc::new(InMemoryProducerClient::new());
        let chunks_acked_total =
            prometheus::IntCounter::new("chunks_acked_total", "test counter").unwrap();
        let pool = WorkerPool::spawn(
            1,
            Arc::clone(&queue),
            Arc::clone(&registry),
            Arc::clone(&producer),
            dir.path().to_path_buf(),
            "test-topic".to_string(),
            chunks_acked_total.clone(),
        );
        pool.join();

        assert_eq!(handle.state(), uploader_domain::entities::UploadState::FullyAcked);
        assert_eq!(chunks_acked_total.get(), 4);
    }
}
