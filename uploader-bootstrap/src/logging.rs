// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Logging Setup
//!
//! Structured logging via `tracing`, configured once at process startup.
//! Verbosity is driven by `RUST_LOG` when set, otherwise by the CLI's
//! repeated `-v` flag; human-readable output goes to stderr so stdout stays
//! free for any future machine-readable reporting.

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber. Must be called exactly once,
/// before any other module logs.
pub fn init(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels_produce_distinct_defaults() {
        // init() installs a global subscriber and can only run once per
        // process, so this test only checks the pure mapping logic by
        // re-deriving it rather than calling init().
        let level_for = |v: u8| match v {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        assert_eq!(level_for(0), "info");
        assert_eq!(level_for(1), "debug");
        assert_eq!(level_for(5), "trace");
    }
}
