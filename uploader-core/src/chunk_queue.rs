// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Queue
//!
//! The bounded, blocking FIFO between the control loop and the worker pool.
//! Built on `crossbeam::channel::bounded`, which already provides exactly
//! the semantics the design calls for: multiple producers, multiple
//! consumers, FIFO ordering, and a `send` that blocks the calling thread
//! when the channel is full -- this blocking is the backpressure boundary
//! referenced throughout the component design.
//!
//! Shutdown uses the sentinel convention from the design: the control loop
//! places exactly one `QueueItem::Shutdown` per worker after every real
//! chunk has been queued, and every worker exits the moment it receives one.

use crossbeam::channel::{bounded, Receiver, RecvError, SendError, Sender};

use uploader_domain::error::UploaderError;
use uploader_domain::services::ChunkSink;
use uploader_domain::value_objects::Chunk;

/// An item taken off the queue by a worker: either real work, or the
/// sentinel that tells the worker to stop.
pub enum QueueItem {
    Chunk(Chunk),
    Shutdown,
}

/// Bounded blocking queue of `Chunk | ShutdownToken`.
pub struct ChunkQueue {
    sender: Sender<QueueItem>,
    receiver: Receiver<QueueItem>,
}

impl ChunkQueue {
    /// Creates a queue with room for `capacity` items in flight.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Blocks until a worker thread can take the chunk, or until every
    /// receiver has been dropped (which does not happen during normal
    /// operation -- every worker holds a clone for its whole lifetime).
    pub fn push_chunk(&self, chunk: Chunk) -> Result<(), UploaderError> {
        self.sender
            .send(QueueItem::Chunk(chunk))
            .map_err(|SendError(_)| UploaderError::Io("chunk queue closed".to_string()))
    }

    /// Places one shutdown sentinel. The control loop calls this once per
    /// worker during the drain phase.
    pub fn push_shutdown(&self) -> Result<(), UploaderError> {
        self.sender
            .send(QueueItem::Shutdown)
            .map_err(|SendError(_)| UploaderError::Io("chunk queue closed".to_string()))
    }

    /// Blocks until an item is available. Returns `Err` only once every
    /// sender has been dropped, which a correctly shut-down run never
    /// triggers (workers exit on the `Shutdown` sentinel instead).
    pub fn take(&self) -> Result<QueueItem, RecvError> {
        self.receiver.recv()
    }

    /// A clonable handle workers use to take items; cloning a
    /// `crossbeam::channel::Receiver` shares the same underlying channel.
    pub fn receiver(&self) -> Receiver<QueueItem> {
        self.receiver.clone()
    }

    pub fn len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> Option<usize> {
        self.sender.capacity()
    }
}

/// Adapts `ChunkQueue` to the domain's `ChunkSink` port so `UploadFile`'s
/// `emit_chunks` never needs to know about the sentinel or the underlying
/// channel type.
impl ChunkSink for ChunkQueue {
    fn push(&self, chunk: Chunk) -> Result<(), UploaderError> {
        self.push_chunk(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use uploader_domain::value_objects::FileFingerprint;

    fn sample_chunk() -> Chunk {
        Chunk::new(
            FileFingerprint::new(&PathBuf::from("a.txt"), 4, "filehash"),
            PathBuf::new(),
            "a.txt".to_string(),
            0,
            1,
            0,
            4,
            "deadbeef".to_string(),
            "filehash".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn push_and_take_round_trip() {
        let queue = ChunkQueue::new(4);
        queue.push_chunk(sample_chunk()).unwrap();
        match queue.take().unwrap() {
            QueueItem::Chunk(_) => {}
            QueueItem::Shutdown => panic!("expected a chunk"),
        }
    }

    #[test]
    fn shutdown_sentinel_is_distinguishable() {
        let queue = ChunkQueue::new(1);
        queue.push_shutdown().unwrap();
        match queue.take().unwrap() {
            QueueItem::Shutdown => {}
            QueueItem::Chunk(_) => panic!("expected shutdown"),
        }
    }

    #[test]
    fn full_queue_blocks_until_drained() {
        let queue = Arc::new(ChunkQueue::new(1));
        queue.push_chunk(sample_chunk()).unwrap();

        let producer = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            producer.push_chunk(sample_chunk()).unwrap();
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!handle.is_finished(), "push should block while queue is full");

        queue.take().unwrap();
        handle.join().unwrap();
    }
}
