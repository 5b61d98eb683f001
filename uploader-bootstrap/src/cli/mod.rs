// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Command-line interface: parse with clap, then validate.

pub mod parser;
pub mod validator;

pub use parser::{Cli, Commands};
pub use validator::{parse_and_validate, ParseError, ValidatedCli, ValidatedCommand, ValidatedRunArgs};
