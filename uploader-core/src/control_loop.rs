// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Control Loop
//!
//! The top-level coordinator: owns the registry, the chunk queue, the
//! directory scanner, and the producer client, and runs the single
//! scheduling thread described in the component design. `start` blocks the
//! calling thread until shutdown completes, so `main` runs it on a
//! dedicated OS thread while a tokio task awaits the termination signal
//! and flips the shared `CancellationToken`.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use tracing::{info, warn};

use uploader_bootstrap::shutdown::CancellationToken;
use uploader_domain::aggregates::Registry;
use uploader_domain::entities::UploadState;
use uploader_domain::error::UploaderError;
use uploader_domain::services::producer_client::DeliveryOutcome;
use uploader_domain::services::ProducerClient;

use crate::chunk_queue::ChunkQueue;
use crate::config::UploaderConfig;
use crate::directory_scanner::DirectoryScanner;
use crate::metrics::RunMetrics;
use crate::worker_pool::WorkerPool;

/// Lifecycle of the control loop itself, distinct from any one file's
/// `UploadState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlLoopState {
    Starting,
    Running,
    Draining,
    Stopped,
}

/// The number of chunks requested per iteration for the file currently
/// chosen by the scheduling policy -- one per worker, so every worker's
/// queue depth stays near one chunk without over-filling the queue.
fn emission_budget(worker_count: usize) -> u64 {
    worker_count as u64
}

/// Owns C2 through C6 for one run and drives the scheduling/shutdown
/// protocol described in the component design.
pub struct ControlLoop {
    config: UploaderConfig,
    registry: Arc<Registry>,
    queue: Arc<ChunkQueue>,
    scanner: DirectoryScanner,
    producer: Arc<dyn ProducerClient>,
    metrics: RunMetrics,
    counted_complete: HashSet<PathBuf>,
    counted_failed: HashSet<PathBuf>,
    state: ControlLoopState,
}

/// Result of a completed run, handed back to `main` for the final summary.
pub struct RunSummary {
    pub uploaded_paths: Vec<PathBuf>,
    pub failed_paths: Vec<PathBuf>,
}

impl ControlLoop {
    pub fn new(config: UploaderConfig, producer: Arc<dyn ProducerClient>) -> Result<Self, UploaderError> {
        let scanner = DirectoryScanner::new(
            config.watched_dir.clone(),
            config.admit_pattern.clone(),
            config.chunk_size,
            config.min_wait,
            config.max_wait,
        );
        Ok(Self {
            registry: Arc::new(Registry::new()),
            queue: Arc::new(ChunkQueue::new(config.queue_capacity)),
            scanner,
            producer,
            metrics: RunMetrics::new()?,
            counted_complete: HashSet::new(),
            counted_failed: HashSet::new(),
            state: ControlLoopState::Starting,
            config,
        })
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    pub fn state(&self) -> ControlLoopState {
        self.state
    }

    /// Runs to completion: scans and schedules until `stop_token` is
    /// cancelled, then executes the full shutdown protocol. Blocks the
    /// calling thread for the lifetime of the run.
    pub fn run(mut self, stop_token: CancellationToken) -> RunSummary {
        self.state = ControlLoopState::Running;
        info!(watched_dir = %self.config.watched_dir.display(), "control loop starting");

        let worker_pool = WorkerPool::spawn(
            self.config.worker_count.count(),
            Arc::clone(&self.queue),
            Arc::clone(&self.registry),
            Arc::clone(&self.producer),
            self.config.watched_dir.clone(),
            self.config.topic.clone(),
            self.metrics.chunks_acked_total.clone(),
        );

        self.run_until_stop(&stop_token);

        self.state = ControlLoopState::Draining;
        info!("shutdown requested, draining in-flight files");
        self.drain(worker_pool);

        self.state = ControlLoopState::Stopped;
        self.summarize()
    }

    /// The scheduling loop proper. Returns once `stop_token` reports
    /// cancelled.
    fn run_until_stop(&mut self, stop_token: &CancellationToken) {
        while !stop_token.is_cancelled() {
            self.prepare_registered_files();
            self.reconcile_metrics();
            self.metrics.queue_depth.set(self.queue.len() as i64);

            match self.next_schedulable_path() {
                Some(path) => {
                    if let Some(file) = self.registry.get(&path) {
                        let budget = emission_budget(self.config.worker_count.count());
                        match file.emit_chunks(self.queue.as_ref(), budget) {
                            Ok(emitted) => {
                                self.metrics.chunks_enqueued_total.inc_by(emitted);
                                self.scanner.reset_backoff();
                            }
                            Err(err) => {
                                warn!(path = %path.display(), error = %err, "emit_chunks failed");
                                file.on_ack(DeliveryOutcome::Failure(err));
                            }
                        }
                    }
                }
                None => {
                    thread::sleep(self.scanner.current_wait());
                    let admitted = self.scanner.scan(&self.registry, self.config.upload_existing);
                    self.metrics.files_discovered_total.inc_by(admitted as u64);
                    if admitted == 0 {
                        self.scanner.backoff();
                    } else {
                        self.scanner.reset_backoff();
                    }
                    self.metrics.scan_wait_seconds.set(self.scanner.current_wait().as_secs_f64());
                }
            }
        }
    }

    /// Calls `prepare()` on at most one `Registered`, admitted file per
    /// invocation, so a readability success transitions it to `Hashed`. A
    /// `FileDisappeared` (or other fatal) result moves the file straight to
    /// `Failed`; `FileNotReady` is left `Registered` for a later tick to
    /// retry.
    ///
    /// `prepare` streams the whole file once to compute its hash, which runs
    /// synchronously on this thread -- a real but bounded suspension point
    /// beyond the adaptive sleep and the queue-full block: capping this to
    /// one file per tick means a newly discovered large file can delay
    /// chunk emission for an already-`InProgress` file by at most one
    /// file's hash time, not by every pending file's.
    fn prepare_registered_files(&self) {
        let next = self
            .registry
            .all_in_order()
            .into_iter()
            .find(|f| f.to_upload() && f.state() == UploadState::Registered);
        let Some(file) = next else {
            return;
        };
        if let Err(err) = file.prepare() {
            if err.is_fatal_to_file() {
                file.on_ack(DeliveryOutcome::Failure(err));
            }
        }
    }

    /// The scheduling policy from the component design: the first file, in
    /// registry-insertion order, that is `InProgress` or `Hashed` and needs
    /// its first chunk.
    fn next_schedulable_path(&self) -> Option<PathBuf> {
        self.registry
            .all_in_order()
            .into_iter()
            .find(|f| f.to_upload() && (f.is_in_progress() || f.needs_first_chunk()))
            .map(|f| f.path().to_path_buf())
    }

    /// Updates the completed/failed counters for any file that reached a
    /// terminal state since the last check. Each path is counted exactly
    /// once.
    fn reconcile_metrics(&mut self) {
        for file in self.registry.all_in_order() {
            match file.state() {
                UploadState::FullyAcked if !self.counted_complete.contains(file.path()) => {
                    self.counted_complete.insert(file.path().to_path_buf());
                    self.metrics.files_completed_total.inc();
                }
                UploadState::Failed(_) if !self.counted_failed.contains(file.path()) => {
                    self.counted_failed.insert(file.path().to_path_buf());
                    self.metrics.files_failed_total.inc();
                }
                _ => {}
            }
        }
    }

    /// Shutdown protocol: stop discovering new files, emit every remaining
    /// chunk of every in-progress file, signal the workers, join them, then
    /// flush and close the producer. Files that were only `Hashed` (never
    /// started) are deliberately left unsent.
    fn drain(&mut self, worker_pool: WorkerPool) {
        for file in self.registry.all_in_order() {
            if !file.is_in_progress() {
                continue;
            }
            loop {
                match file.emit_chunks(self.queue.as_ref(), u64::MAX) {
                    Ok(0) => break,
                    Ok(emitted) => {
                        self.metrics.chunks_enqueued_total.inc_by(emitted);
                        self.metrics.queue_depth.set(self.queue.len() as i64);
                    }
                    Err(err) => {
                        warn!(path = %file.path().display(), error = %err, "drain emit_chunks failed");
                        file.on_ack(DeliveryOutcome::Failure(err));
                        break;
                    }
                }
            }
        }

        for _ in 0..self.config.worker_count.count() {
            if let Err(err) = self.queue.push_shutdown() {
                warn!(error = %err, "failed to push shutdown token");
            }
        }

        worker_pool.join();

        if let Err(err) = self.producer.flush(std::time::Duration::MAX) {
            warn!(error = %err, "producer flush reported an error during drain");
        }
        self.producer.close();

        self.reconcile_metrics();
    }

    /// Multi-line human-readable progress summary, mirroring the progress
    /// report the run prints on completion.
    pub fn status_report(&self) -> String {
        self.registry
            .all_in_order()
            .iter()
            .map(|f| f.status_msg())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn summarize(&self) -> RunSummary {
        let mut uploaded_paths = Vec::new();
        let mut failed_paths = Vec::new();
        for file in self.registry.all_in_order() {
            match file.state() {
                UploadState::FullyAcked => uploaded_paths.push(file.path().to_path_buf()),
                UploadState::Failed(_) => failed_paths.push(file.path().to_path_buf()),
                _ => {}
            }
        }
        RunSummary { uploaded_paths, failed_paths }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliOverrides;
    use crate::producer::InMemoryProducerClient;
    use std::fs;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::tempdir;
    use uploader_bootstrap::shutdown::ShutdownCoordinator;

    fn config_for(dir: &std::path::Path, topic: &str) -> UploaderConfig {
        UploaderConfig::load(
            None,
            CliOverrides {
                watched_dir: Some(dir.to_path_buf()),
                topic: Some(topic.to_string()),
                worker_count: Some(2),
                chunk_size: Some(4),
                queue_capacity: Some(8),
                upload_existing: Some(true),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn small_file_is_uploaded_end_to_end() {
        let dir = tempdir().unwrap();
        fs::File::create(dir.path().join("a.txt")).unwrap().write_all(b"0123456789abcdef").unwrap();

        let config = config_for(dir.path(), "t");
        let producer = Arc::new(InMemoryProducerClient::new());
        let control_loop = ControlLoop::new(config, producer.clone()).unwrap();

        let coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();
        let stopper = coordinator.clone();
        let handle = thread::spawn(move || control_loop.run(token));

        // Give the control loop two scan cycles (stable-size check needs
        // two observations) before requesting shutdown.
        thread::sleep(Duration::from_millis(300));
        stopper.initiate_shutdown();
        let summary = handle.join().unwrap();

        assert_eq!(summary.uploaded_paths.len(), 1);
        assert!(summary.failed_paths.is_empty());
        assert_eq!(producer.delivered_count(), 4);
    }

    #[test]
    fn upload_existing_false_never_schedules_pre_existing_file() {
        let dir = tempdir().unwrap();
        fs::File::create(dir.path().join("a.txt")).unwrap().write_all(b"hello").unwrap();

        let mut config = config_for(dir.path(), "t");
        config.upload_existing = false;
        let producer = Arc::new(InMemoryProducerClient::new());
        let control_loop = ControlLoop::new(config, producer.clone()).unwrap();

        let coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();
        let stopper = coordinator.clone();
        let handle = thread::spawn(move || control_loop.run(token));

        thread::sleep(Duration::from_millis(300));
        stopper.initiate_shutdown();
        let summary = handle.join().unwrap();

        assert!(summary.uploaded_paths.is_empty());
        assert_eq!(producer.delivered_count(), 0);
    }

    #[test]
    fn failing_producer_moves_file_to_failed_without_aborting_run() {
        let dir = tempdir().unwrap();
        fs::File::create(dir.path().join("a.txt")).unwrap().write_all(b"0123456789abcdef").unwrap();

        let config = config_for(dir.path(), "t");
        let producer = Arc::new(InMemoryProducerClient::failing());
        let control_loop = ControlLoop::new(config, producer.clone()).unwrap();

        let coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();
        let stopper = coordinator.clone();
        let handle = thread::spawn(move || control_loop.run(token));

        thread::sleep(Duration::from_millis(300));
        stopper.initiate_shutdown();
        let summary = handle.join().unwrap();

        assert!(summary.uploaded_paths.is_empty());
        assert_eq!(summary.failed_paths.len(), 1);
    }
}
