// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! CLI structure and clap parsing. Every flag here mirrors one option from
//! the run-configuration table; `config` layers underneath them (flags take
//! precedence -- see `uploader_core::config`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "uploader", version, about = "Directory-watching chunked uploader")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Optional TOML configuration file; CLI flags override its values.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start watching a directory and uploading admitted files.
    Run {
        /// Root of the periodic scan.
        #[arg(long)]
        watched_dir: Option<PathBuf>,

        /// Regular expression; files whose basename matches are admitted.
        #[arg(long)]
        admit_pattern: Option<String>,

        /// Bytes per chunk.
        #[arg(long)]
        chunk_size: Option<u64>,

        /// Number of producer worker threads.
        #[arg(long)]
        worker_count: Option<usize>,

        /// Maximum chunks in the bounded queue.
        #[arg(long)]
        queue_capacity: Option<usize>,

        /// Register files present at startup for upload too (default: only
        /// upload files that appear after startup).
        #[arg(long)]
        upload_existing: bool,

        /// Path handed to the producer client's own config parser.
        #[arg(long)]
        producer_config_path: Option<PathBuf>,

        /// Destination topic on the bus.
        #[arg(long)]
        topic: Option<String>,
    },
    /// Parse and validate a configuration file without starting a run.
    ValidateConfig {
        /// Path to the TOML configuration file to validate.
        config: PathBuf,
    },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
