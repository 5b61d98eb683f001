// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Uploader CLI
//!
//! Entry point for the `uploader` binary: parse and validate arguments,
//! initialize logging, load the run configuration, and either run the
//! control loop to completion or just validate a config file, depending on
//! the subcommand.
//!
//! The control loop itself is synchronous and runs on a dedicated OS
//! thread; a small tokio runtime exists only to host the signal-listening
//! task that bridges SIGINT/SIGTERM into the `CancellationToken` the loop
//! polls.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use tracing::{error, info};

use uploader_bootstrap::cli::{ValidatedCommand, ValidatedRunArgs};
use uploader_bootstrap::{parse_and_validate, ExitCode, ShutdownCoordinator};
use uploader_core::config::CliOverrides;
use uploader_core::{ControlLoop, UploaderConfig};
use uploader_domain::services::ProducerClient;

#[tokio::main]
async fn main() {
    let validated = match parse_and_validate() {
        Ok(validated) => validated,
        Err(err) => {
            eprintln!("invalid arguments: {err}");
            std::process::exit(ExitCode::UsageError.as_i32());
        }
    };

    uploader_bootstrap::logging::init(validated.verbose);

    let exit_code = match validated.command {
        ValidatedCommand::ValidateConfig { config } => run_validate_config(&config),
        ValidatedCommand::Run(args) => run(validated.config, args).await,
    };

    if !exit_code.is_success() {
        error!(exit_code = %exit_code, "uploader exiting with error");
    }
    std::process::exit(exit_code.as_i32());
}

fn run_validate_config(config_path: &PathBuf) -> ExitCode {
    match UploaderConfig::load(Some(config_path), CliOverrides::default()) {
        Ok(config) => {
            info!(watched_dir = %config.watched_dir.display(), topic = %config.topic, "configuration is valid");
            ExitCode::Success
        }
        Err(err) => {
            error!(error = %err, "configuration is invalid");
            ExitCode::from_uploader_error(&err)
        }
    }
}

fn overrides_from(args: ValidatedRunArgs) -> CliOverrides {
    CliOverrides {
        watched_dir: args.watched_dir,
        admit_pattern: args.admit_pattern,
        chunk_size: args.chunk_size,
        worker_count: args.worker_count,
        queue_capacity: args.queue_capacity,
        upload_existing: args.upload_existing.then_some(true),
        producer_config_path: args.producer_config_path,
        topic: args.topic,
    }
}

async fn run(config_path: Option<PathBuf>, args: ValidatedRunArgs) -> ExitCode {
    let overrides = overrides_from(args);

    let config = match UploaderConfig::load(config_path.as_deref(), overrides) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            return ExitCode::from_uploader_error(&err);
        }
    };

    let producer: Arc<dyn ProducerClient> = match build_producer(&config) {
        Ok(producer) => producer,
        Err(err) => {
            error!(error = %err, "failed to construct producer client");
            return ExitCode::from_uploader_error(&err);
        }
    };

    let control_loop = match ControlLoop::new(config, producer) {
        Ok(control_loop) => control_loop,
        Err(err) => {
            error!(error = %err, "failed to build control loop");
            return ExitCode::from_uploader_error(&err);
        }
    };

    let coordinator = ShutdownCoordinator::new();
    let token = coordinator.token();
    let signal_task = tokio::spawn(async move { coordinator.wait_for_signal().await });

    let run_handle = thread::Builder::new()
        .name("uploader-control-loop".to_string())
        .spawn(move || control_loop.run(token))
        .expect("failed to spawn control loop thread");

    let summary = match run_handle.join() {
        Ok(summary) => summary,
        Err(panic) => {
            error!(?panic, "control loop thread panicked");
            return ExitCode::Software;
        }
    };

    signal_task.abort();

    info!(
        uploaded = summary.uploaded_paths.len(),
        failed = summary.failed_paths.len(),
        "run complete"
    );
    for path in &summary.failed_paths {
        error!(path = %path.display(), "file failed to upload");
    }

    if summary.failed_paths.is_empty() {
        ExitCode::Success
    } else {
        ExitCode::Error
    }
}

#[cfg(feature = "kafka")]
fn build_producer(config: &UploaderConfig) -> Result<Arc<dyn ProducerClient>, uploader_domain::error::UploaderError> {
    match &config.producer_config_path {
        Some(path) => Ok(Arc::new(uploader_core::producer::kafka::KafkaProducerClient::new(path)?)),
        None => Ok(Arc::new(uploader_core::producer::InMemoryProducerClient::new())),
    }
}

#[cfg(not(feature = "kafka"))]
fn build_producer(config: &UploaderConfig) -> Result<Arc<dyn ProducerClient>, uploader_domain::error::UploaderError> {
    if config.producer_config_path.is_some() {
        return Err(uploader_domain::error::UploaderError::Configuration(
            "producer_config_path was set but this build was compiled without the `kafka` feature".to_string(),
        ));
    }
    Ok(Arc::new(uploader_core::producer::InMemoryProducerClient::new()))
}
