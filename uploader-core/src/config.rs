// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Run Configuration
//!
//! `UploaderConfig` is the fully validated, immutable configuration for one
//! run of the control loop. It is assembled in two layers, mirroring the
//! bootstrap layer's own config-plus-CLI-override pattern: an optional TOML
//! file loaded through the `config` crate, then individual fields
//! overridden by whichever CLI flags the user actually passed. Numeric and
//! pattern fields are validated by constructing the corresponding domain
//! value object, so a bad config file is rejected before any thread starts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use uploader_domain::error::UploaderError;
use uploader_domain::value_objects::{AdmitPattern, ChunkSize, WorkerCount};

/// Default floor of the adaptive scan interval.
pub const DEFAULT_MIN_WAIT: Duration = Duration::from_millis(50);

/// Default ceiling of the adaptive scan interval.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(60);

/// Default bounded-queue capacity, in chunks.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// On-disk representation, deserialized by `config`/`toml` before
/// validation. Every field is optional so a config file may specify only
/// the options it wants to override from the built-in defaults.
#[derive(Debug, Default, Deserialize, Serialize)]
struct RawConfig {
    watched_dir: Option<PathBuf>,
    admit_pattern: Option<String>,
    chunk_size: Option<u64>,
    worker_count: Option<usize>,
    queue_capacity: Option<usize>,
    upload_existing: Option<bool>,
    min_wait_ms: Option<u64>,
    max_wait_ms: Option<u64>,
    producer_config_path: Option<PathBuf>,
    topic: Option<String>,
}

/// Fully validated run configuration.
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    pub watched_dir: PathBuf,
    pub admit_pattern: AdmitPattern,
    pub chunk_size: ChunkSize,
    pub worker_count: WorkerCount,
    pub queue_capacity: usize,
    pub upload_existing: bool,
    pub min_wait: Duration,
    pub max_wait: Duration,
    pub producer_config_path: Option<PathBuf>,
    pub topic: String,
}

/// CLI-supplied overrides, applied on top of whatever a config file
/// provided. `None` means "not passed on the command line, keep the
/// file/default value."
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub watched_dir: Option<PathBuf>,
    pub admit_pattern: Option<String>,
    pub chunk_size: Option<u64>,
    pub worker_count: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub upload_existing: Option<bool>,
    pub producer_config_path: Option<PathBuf>,
    pub topic: Option<String>,
}

impl UploaderConfig {
    /// Loads an optional TOML file, applies CLI overrides, then validates
    /// every field by constructing its domain value object.
    pub fn load(config_path: Option<&Path>, overrides: CliOverrides) -> Result<Self, UploaderError> {
        let mut raw = match config_path {
            Some(path) => Self::read_raw(path)?,
            None => RawConfig::default(),
        };

        if let Some(v) = overrides.watched_dir {
            raw.watched_dir = Some(v);
        }
        if let Some(v) = overrides.admit_pattern {
            raw.admit_pattern = Some(v);
        }
        if let Some(v) = overrides.chunk_size {
            raw.chunk_size = Some(v);
        }
        if let Some(v) = overrides.worker_count {
            raw.worker_count = Some(v);
        }
        if let Some(v) = overrides.queue_capacity {
            raw.queue_capacity = Some(v);
        }
        if let Some(v) = overrides.upload_existing {
            raw.upload_existing = Some(v);
        }
        if let Some(v) = overrides.producer_config_path {
            raw.producer_config_path = Some(v);
        }
        if let Some(v) = overrides.topic {
            raw.topic = Some(v);
        }

        Self::validate(raw)
    }

    fn read_raw(path: &Path) -> Result<RawConfig, UploaderError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .map_err(|e| UploaderError::Configuration(format!("loading config file {}: {e}", path.display())))?;
        settings
            .try_deserialize()
            .map_err(|e| UploaderError::Configuration(format!("parsing config file {}: {e}", path.display())))
    }

    fn validate(raw: RawConfig) -> Result<Self, UploaderError> {
        let watched_dir = raw
            .watched_dir
            .ok_or_else(|| UploaderError::Configuration("watched_dir is required".to_string()))?;
        if !watched_dir.is_dir() {
            return Err(UploaderError::Configuration(format!(
                "watched_dir {} is not a directory",
                watched_dir.display()
            )));
        }

        let admit_pattern = match raw.admit_pattern {
            Some(pattern) => AdmitPattern::new(&pattern)?,
            None => AdmitPattern::match_all(),
        };

        let chunk_size = match raw.chunk_size {
            Some(bytes) => ChunkSize::new(bytes)?,
            None => ChunkSize::default(),
        };

        let worker_count = match raw.worker_count {
            Some(count) => WorkerCount::new(count)?,
            None => WorkerCount::default_for_system(),
        };

        let queue_capacity = raw.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY);
        if queue_capacity == 0 {
            return Err(UploaderError::Configuration("queue_capacity must be at least 1".to_string()));
        }

        let min_wait = raw.min_wait_ms.map(Duration::from_millis).unwrap_or(DEFAULT_MIN_WAIT);
        let max_wait = raw.max_wait_ms.map(Duration::from_millis).unwrap_or(DEFAULT_MAX_WAIT);
        if min_wait > max_wait {
            return Err(UploaderError::Configuration(format!(
                "min_wait ({min_wait:?}) must not exceed max_wait ({max_wait:?})"
            )));
        }

        let topic = raw
            .topic
            .ok_or_else(|| UploaderError::Configuration("topic is required".to_string()))?;
        if topic.trim().is_empty() {
            return Err(UploaderError::Configuration("topic must not be empty".to_string()));
        }

        Ok(Self {
            watched_dir,
            admit_pattern,
            chunk_size,
            worker_count,
            queue_capacity,
            upload_existing: raw.upload_existing.unwrap_or(false),
            min_wait,
            max_wait,
            producer_config_path: raw.producer_config_path,
            topic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn overrides_for(watched_dir: PathBuf) -> CliOverrides {
        CliOverrides {
            watched_dir: Some(watched_dir),
            topic: Some("chunks".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn missing_watched_dir_is_rejected() {
        let result = UploaderConfig::load(
            None,
            CliOverrides { topic: Some("chunks".to_string()), ..Default::default() },
        );
        assert!(result.is_err());
    }

    #[test]
    fn missing_topic_is_rejected() {
        let dir = tempdir().unwrap();
        let result = UploaderConfig::load(
            None,
            CliOverrides { watched_dir: Some(dir.path().to_path_buf()), ..Default::default() },
        );
        assert!(result.is_err());
    }

    #[test]
    fn defaults_apply_when_nothing_configured() {
        let dir = tempdir().unwrap();
        let config = UploaderConfig::load(None, overrides_for(dir.path().to_path_buf())).unwrap();
        assert_eq!(config.chunk_size, ChunkSize::default());
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert!(!config.upload_existing);
    }

    #[test]
    fn cli_override_wins_over_file() {
        let dir = tempdir().unwrap();
        let config_file = dir.path().join("uploader.toml");
        std::fs::File::create(&config_file)
            .unwrap()
            .write_all(format!("watched_dir = \"{}\"\ntopic = \"from-file\"\nchunk_size = 2048\n", dir.path().display()).as_bytes())
            .unwrap();

        let config = UploaderConfig::load(
            Some(&config_file),
            CliOverrides { topic: Some("from-cli".to_string()), ..Default::default() },
        )
        .unwrap();

        assert_eq!(config.topic, "from-cli");
        assert_eq!(config.chunk_size.bytes(), 2048);
    }

    #[test]
    fn invalid_chunk_size_is_rejected() {
        let dir = tempdir().unwrap();
        let mut ov = overrides_for(dir.path().to_path_buf());
        ov.chunk_size = Some(0);
        assert!(UploaderConfig::load(None, ov).is_err());
    }

    #[test]
    fn min_wait_exceeding_max_wait_is_rejected() {
        let dir = tempdir().unwrap();
        let config_file = dir.path().join("uploader.toml");
        std::fs::File::create(&config_file)
            .unwrap()
            .write_all(
                format!(
                    "watched_dir = \"{}\"\ntopic = \"t\"\nmin_wait_ms = 1000\nmax_wait_ms = 100\n",
                    dir.path().display()
                )
                .as_bytes(),
            )
            .unwrap();
        assert!(UploaderConfig::load(Some(&config_file), CliOverrides::default()).is_err());
    }
}
