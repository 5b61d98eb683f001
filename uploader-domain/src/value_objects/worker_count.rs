// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Worker Count Value Object
//!
//! Type-safe representation of the number of producer worker threads
//! configured for a run. Bounded to a sane range so a bad configuration file
//! can't spawn an unreasonable number of threads or leave the pool empty.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::UploaderError;

/// Worker count value object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerCount {
    count: usize,
}

impl WorkerCount {
    /// Minimum number of workers (always at least 1).
    pub const MIN_WORKERS: usize = 1;

    /// Maximum number of workers (prevents resource exhaustion from a bad
    /// config file).
    pub const MAX_WORKERS: usize = 64;

    /// Default worker count used when none is configured.
    pub const DEFAULT_WORKERS: usize = 4;

    /// Creates a new `WorkerCount`, rejecting values outside
    /// `[MIN_WORKERS, MAX_WORKERS]`.
    pub fn new(count: usize) -> Result<Self, UploaderError> {
        if count < Self::MIN_WORKERS {
            return Err(UploaderError::Configuration(format!(
                "worker_count must be at least {}, got {count}",
                Self::MIN_WORKERS
            )));
        }
        if count > Self::MAX_WORKERS {
            return Err(UploaderError::Configuration(format!(
                "worker_count must not exceed {}, got {count}",
                Self::MAX_WORKERS
            )));
        }
        Ok(Self { count })
    }

    /// Returns the number of workers.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns a worker count based on the number of available CPU cores,
    /// used as a fallback when nothing is configured.
    pub fn default_for_system() -> Self {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(Self::DEFAULT_WORKERS);
        Self {
            count: available.clamp(Self::MIN_WORKERS, Self::MAX_WORKERS),
        }
    }
}

impl Default for WorkerCount {
    fn default() -> Self {
        Self { count: Self::DEFAULT_WORKERS }
    }
}

impl fmt::Display for WorkerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} worker(s)", self.count)
    }
}

impl From<WorkerCount> for usize {
    fn from(worker_count: WorkerCount) -> Self {
        worker_count.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero() {
        assert!(WorkerCount::new(0).is_err());
    }

    #[test]
    fn rejects_too_many() {
        assert!(WorkerCount::new(WorkerCount::MAX_WORKERS + 1).is_err());
    }

    #[test]
    fn accepts_valid_count() {
        assert_eq!(WorkerCount::new(8).unwrap().count(), 8);
    }

    #[test]
    fn default_for_system_is_bounded() {
        let wc = WorkerCount::default_for_system();
        assert!(wc.count() >= WorkerCount::MIN_WORKERS);
        assert!(wc.count() <= WorkerCount::MAX_WORKERS);
    }

    #[test]
    fn display_format() {
        assert_eq!(format!("{}", WorkerCount::new(4).unwrap()), "4 worker(s)");
    }
}
