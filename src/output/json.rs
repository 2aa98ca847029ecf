//! JSON output formatter for duplicate reports.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "directories": [
//!     { "kept": "/data/a", "redundant": "/data/b" }
//!   ],
//!   "files": [
//!     { "kept": "/data/c/x.txt", "redundant": "/data/d/x.txt" }
//!   ],
//!   "collisions": [],
//!   "summary": {
//!     "duplicate_directories": 1,
//!     "duplicate_files": 1,
//!     "collisions": 0,
//!     "exit_code": 0,
//!     "exit_code_name": "DP000"
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::duplicates::{DiffOutcome, DirectoryPair, DuplicatePair, HashCollision};
use crate::error::ExitCode;

/// Counts in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Number of consolidated directory pairs
    pub duplicate_directories: usize,
    /// Number of file pairs outside consolidated directories
    pub duplicate_files: usize,
    /// Number of hash collisions
    pub collisions: usize,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DP000")
    pub exit_code_name: String,
}

/// Complete JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport<'a> {
    /// Consolidated directory pairs
    pub directories: &'a [DirectoryPair],
    /// Remaining file pairs
    pub files: &'a [DuplicatePair],
    /// Hash collisions
    pub collisions: &'a [HashCollision],
    /// Summary statistics
    pub summary: JsonSummary,
}

impl<'a> JsonReport<'a> {
    /// Create a report for `outcome`.
    #[must_use]
    pub fn new(outcome: &'a DiffOutcome, exit_code: ExitCode) -> Self {
        Self {
            directories: &outcome.directories,
            files: &outcome.files,
            collisions: &outcome.collisions,
            summary: JsonSummary {
                duplicate_directories: outcome.directories.len(),
                duplicate_files: outcome.files.len(),
                collisions: outcome.collisions.len(),
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty-printed JSON and a trailing newline to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()
    }
}
