// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Security and sanity validation for parsed CLI arguments: paths are
//! checked for traversal patterns and existence, numeric flags are checked
//! against the same bounds their domain value objects enforce, so a bad
//! flag is rejected before any thread is spawned rather than surfacing as a
//! `Configuration` error deep inside the control loop.

use std::path::{Path, PathBuf};
use thiserror::Error;

use uploader_domain::{AdmitPattern, ChunkSize, WorkerCount};

use super::parser::{Cli, Commands};

const DANGEROUS_PATH_PATTERNS: &[&str] = &["..", "\0", "\n", "\r"];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("dangerous pattern '{pattern}' found in argument: {arg}")]
    DangerousPattern { pattern: String, arg: String },

    #[error("path does not exist: {0}")]
    PathNotFound(String),

    #[error("invalid argument {arg}: {reason}")]
    InvalidValue { arg: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct ValidatedRunArgs {
    pub watched_dir: Option<PathBuf>,
    pub admit_pattern: Option<String>,
    pub chunk_size: Option<u64>,
    pub worker_count: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub upload_existing: bool,
    pub producer_config_path: Option<PathBuf>,
    pub topic: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Run(ValidatedRunArgs),
    ValidateConfig { config: PathBuf },
}

#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: u8,
    pub config: Option<PathBuf>,
}

fn check_dangerous(arg: &str) -> Result<(), ParseError> {
    for pattern in DANGEROUS_PATH_PATTERNS {
        if arg.contains(pattern) {
            return Err(ParseError::DangerousPattern { pattern: pattern.to_string(), arg: arg.to_string() });
        }
    }
    Ok(())
}

fn validate_existing_path(path: &Path) -> Result<PathBuf, ParseError> {
    check_dangerous(&path.to_string_lossy())?;
    path.canonicalize().map_err(|_| ParseError::PathNotFound(path.display().to_string()))
}

pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    validate_cli(super::parser::parse_cli())
}

pub fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config = match cli.config {
        Some(path) => Some(validate_existing_path(&path)?),
        None => None,
    };

    let command = match cli.command {
        Commands::Run {
            watched_dir,
            admit_pattern,
            chunk_size,
            worker_count,
            queue_capacity,
            upload_existing,
            producer_config_path,
            topic,
        } => {
            let watched_dir = watched_dir.map(|p| validate_existing_path(&p)).transpose()?;

            if let Some(ref pattern) = admit_pattern {
                AdmitPattern::new(pattern)
                    .map_err(|e| ParseError::InvalidValue { arg: "admit-pattern".into(), reason: e.to_string() })?;
            }

            if let Some(size) = chunk_size {
                ChunkSize::new(size)
                    .map_err(|e| ParseError::InvalidValue { arg: "chunk-size".into(), reason: e.to_string() })?;
            }

            if let Some(count) = worker_count {
                WorkerCount::new(count)
                    .map_err(|e| ParseError::InvalidValue { arg: "worker-count".into(), reason: e.to_string() })?;
            }

            if let Some(capacity) = queue_capacity {
                if capacity == 0 {
                    return Err(ParseError::InvalidValue {
                        arg: "queue-capacity".into(),
                        reason: "must be greater than 0".into(),
                    });
                }
            }

            let producer_config_path =
                producer_config_path.map(|p| validate_existing_path(&p)).transpose()?;

            if let Some(ref t) = topic {
                check_dangerous(t)?;
                if t.is_empty() {
                    return Err(ParseError::InvalidValue { arg: "topic".into(), reason: "must not be empty".into() });
                }
            }

            ValidatedCommand::Run(ValidatedRunArgs {
                watched_dir,
                admit_pattern,
                chunk_size,
                worker_count,
                queue_capacity,
                upload_existing,
                producer_config_path,
                topic,
            })
        }
        Commands::ValidateConfig { config } => {
            ValidatedCommand::ValidateConfig { config: validate_existing_path(&config)? }
        }
    };

    Ok(ValidatedCli { command, verbose: cli.verbose, config })
}
