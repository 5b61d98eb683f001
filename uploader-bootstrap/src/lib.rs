// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Uploader Bootstrap
//!
//! The bootstrap layer sits outside the domain/core layers and owns the
//! parts of the process that are about being a *process*: parsing and
//! validating arguments, mapping results to Unix exit codes, and bridging
//! OS signals into the cooperative shutdown the control loop polls for.
//!
//! ## Module Structure
//!
//! - [`cli`]: clap-based argument parsing plus a security validation pass.
//! - [`exit_code`]: `sysexits.h`-style process exit codes.
//! - [`shutdown`]: the `CancellationToken` / `ShutdownCoordinator` pair that
//!   lets an async signal-listening task request that a blocking,
//!   thread-based control loop stop.

pub mod cli;
pub mod exit_code;
pub mod logging;
pub mod shutdown;

pub use cli::{parse_and_validate, ValidatedCli, ValidatedCommand};
pub use exit_code::ExitCode;
pub use shutdown::{CancellationToken, ShutdownCoordinator};
