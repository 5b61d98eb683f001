// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Code Management
//!
//! Standardized Unix exit codes following BSD `sysexits.h` conventions, so a
//! supervising process (systemd, a shell script, a Kafka Connect wrapper)
//! can tell a configuration error from an I/O failure from an interrupted
//! run without scraping log text.

use std::fmt;

use uploader_domain::UploaderError;

/// Exit codes following Unix conventions (BSD sysexits.h).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful termination; every admitted file reached `FullyAcked`.
    #[default]
    Success = 0,

    /// General error not covered by a more specific code below.
    Error = 1,

    /// Invalid arguments or an unknown flag.
    UsageError = 64,

    /// Malformed configuration file or admit-pattern regex.
    DataError = 65,

    /// The watched root does not exist or cannot be read.
    NoInput = 66,

    /// A required producer/broker resource was unreachable.
    Unavailable = 69,

    /// Unexpected internal error; should not happen in normal operation.
    Software = 70,

    /// Read or write failure against the watched filesystem.
    IoError = 74,

    /// Insufficient privileges to read the watched root or its files.
    NoPerm = 77,

    /// A required configuration value was missing or out of range.
    Config = 78,

    /// Interrupted by SIGINT (Ctrl+C).
    Interrupted = 130,

    /// Terminated by SIGTERM.
    Terminated = 143,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Maps a terminal `UploaderError` to the exit code a supervising
    /// process should see. Per-file failures (`FileDisappeared`,
    /// `ChunkDataCorrupted`, `ProducerPermanent`) don't reach this path --
    /// they're absorbed into the per-file `Failed` state and the run still
    /// exits `Success` if every *other* file completed. This mapping is only
    /// for the errors that abort the run before or during startup.
    pub fn from_uploader_error(error: &UploaderError) -> Self {
        match error {
            UploaderError::Configuration(_) => ExitCode::Config,
            UploaderError::FileDisappeared(_) | UploaderError::FileNotReady(_) => ExitCode::NoInput,
            UploaderError::Io(_) => ExitCode::IoError,
            UploaderError::ChunkDataCorrupted(_) | UploaderError::InvalidChunk(_) => ExitCode::DataError,
            UploaderError::ProducerPermanent(_) => ExitCode::Unavailable,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::Error => "General error",
            ExitCode::UsageError => "Command line usage error",
            ExitCode::DataError => "Data format error",
            ExitCode::NoInput => "Cannot open input",
            ExitCode::Unavailable => "Service unavailable",
            ExitCode::Software => "Internal software error",
            ExitCode::IoError => "I/O error",
            ExitCode::NoPerm => "Permission denied",
            ExitCode::Config => "Configuration error",
            ExitCode::Interrupted => "Interrupted by signal (SIGINT)",
            ExitCode::Terminated => "Terminated by signal (SIGTERM)",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code.as_i32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_match_sysexits_conventions() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::UsageError.as_i32(), 64);
        assert_eq!(ExitCode::Config.as_i32(), 78);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
    }

    #[test]
    fn configuration_error_maps_to_config() {
        let err = UploaderError::Configuration("bad regex".into());
        assert_eq!(ExitCode::from_uploader_error(&err), ExitCode::Config);
    }

    #[test]
    fn producer_permanent_maps_to_unavailable() {
        let err = UploaderError::ProducerPermanent("broker unreachable".into());
        assert_eq!(ExitCode::from_uploader_error(&err), ExitCode::Unavailable);
    }

    #[test]
    fn is_success_only_for_success() {
        assert!(ExitCode::Success.is_success());
        assert!(!ExitCode::Error.is_success());
    }
}
