// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shutdown Coordination
//!
//! Bridges tokio's async signal handling to the blocking, OS-thread-based
//! control loop. A `ShutdownCoordinator` is created in `main`, handed a
//! `CancellationToken` clone to the control loop thread (which only ever
//! calls the synchronous, non-blocking `is_cancelled`), and awaited from an
//! async task that listens for SIGINT/SIGTERM.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// A clonable, thread-safe flag that the control loop polls each iteration
/// to decide whether to begin its shutdown sequence.
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    fn new() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)), notify: Arc::new(Notify::new()) }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Non-blocking check, safe to call from the control loop's OS thread on
    /// every scheduling iteration.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called. Only meaningful from async
    /// context; the control loop thread uses `is_cancelled` instead.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Owns the single cancellation token for a run and the signal-listening
/// task that triggers it.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    shutdown_initiated: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self { token: CancellationToken::new(), shutdown_initiated: Arc::new(AtomicBool::new(false)) }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Idempotent: only the first caller actually cancels the token, so a
    /// second SIGTERM while already draining is a no-op rather than a
    /// second cascading shutdown.
    pub fn initiate_shutdown(&self) {
        if self.shutdown_initiated.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
            tracing::info!("shutdown requested, notifying control loop");
            self.token.cancel();
        }
    }

    /// Awaits SIGINT or SIGTERM and initiates shutdown on either. Intended
    /// to be spawned as its own tokio task from `main`.
    #[cfg(unix)]
    pub async fn wait_for_signal(&self) {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM");
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("received SIGINT (Ctrl+C)");
            }
        }
        self.initiate_shutdown();
    }

    #[cfg(not(unix))]
    pub async fn wait_for_signal(&self) {
        tokio::signal::ctrl_c().await.expect("failed to register Ctrl+C handler");
        tracing::info!("received Ctrl+C");
        self.initiate_shutdown();
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_uncancelled() {
        let coordinator = ShutdownCoordinator::new();
        assert!(!coordinator.token().is_cancelled());
    }

    #[test]
    fn initiate_shutdown_cancels_token() {
        let coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();
        coordinator.initiate_shutdown();
        assert!(token.is_cancelled());
        assert!(coordinator.is_shutting_down());
    }

    #[test]
    fn initiate_shutdown_is_idempotent() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.initiate_shutdown();
        coordinator.initiate_shutdown();
        assert!(coordinator.is_shutting_down());
    }

    #[tokio::test]
    async fn cancelled_future_resolves_after_cancel() {
        let coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();
        coordinator.initiate_shutdown();
        tokio::time::timeout(std::time::Duration::from_millis(100), token.cancelled())
            .await
            .expect("cancelled() should resolve immediately once already cancelled");
    }
}
