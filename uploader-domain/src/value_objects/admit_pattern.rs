// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Admit Pattern Value Object
//!
//! Wraps a compiled regular expression that decides, by basename alone,
//! whether a discovered file should be admitted into the upload registry.
//! Hidden files (dotfiles), log files, and anything not matching the
//! configured pattern are rejected before a single byte is read.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

use crate::error::UploaderError;

/// Built-in suffixes that are never admitted, regardless of the configured
/// pattern -- matches the reference implementation's log-file exclusion.
const ALWAYS_REJECTED_SUFFIXES: &[&str] = &[".log"];

/// A validated, compiled basename-matching filter.
#[derive(Debug, Clone)]
pub struct AdmitPattern {
    source: String,
    regex: Regex,
}

impl AdmitPattern {
    /// Compiles `pattern` into an `AdmitPattern`, rejecting invalid regex
    /// syntax at configuration time rather than at first use.
    pub fn new(pattern: &str) -> Result<Self, UploaderError> {
        let regex = Regex::new(pattern)
            .map_err(|e| UploaderError::Configuration(format!("invalid admit pattern: {e}")))?;
        Ok(Self { source: pattern.to_string(), regex })
    }

    /// The default pattern: matches any basename (still subject to the
    /// hidden-file and always-rejected-suffix rules below).
    pub fn match_all() -> Self {
        Self::new(".*").expect("'.*' is always a valid regex")
    }

    /// Returns the original pattern source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Decides whether `path` should be admitted for upload. A path is
    /// admitted when:
    /// - it is a regular file (directories are never admitted here; the
    ///   scanner filters those out before calling this),
    /// - its basename does not start with `.` (hidden files are skipped),
    /// - its basename does not end in one of `ALWAYS_REJECTED_SUFFIXES`,
    /// - its basename matches the configured pattern.
    pub fn admits(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if name.starts_with('.') {
            return false;
        }
        if ALWAYS_REJECTED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
            return false;
        }
        self.regex.is_match(name)
    }
}

impl PartialEq for AdmitPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for AdmitPattern {}

impl Default for AdmitPattern {
    fn default() -> Self {
        Self::match_all()
    }
}

impl fmt::Display for AdmitPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl Serialize for AdmitPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for AdmitPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Self::new(&source).map_err(serde::de::Error::custom)
    }
}
