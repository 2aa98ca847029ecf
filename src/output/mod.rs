//! Rendering of run results.
//!
//! This module provides:
//! - A log-style duplicate report (warn level, one entry per pair)
//! - A JSON duplicate report for scripting ([`json`])
//! - Purge list writing
//! - Creation of output files, which must not exist beforehand
//!
//! # Example
//!
//! ```no_run
//! use duppur::duplicates::DuplicateEngine;
//! use duppur::index::Index;
//! use duppur::output::{log_report, write_purge_list};
//! use duppur::scanner::ExclusionSet;
//!
//! let index = Index::new();
//! let exclusions = ExclusionSet::empty();
//! let outcome = DuplicateEngine::new(&exclusions).find_duplicates(&index);
//! log_report(&outcome);
//! write_purge_list(&outcome.purge_candidates(), std::io::stdout()).unwrap();
//! ```

pub mod json;

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::duplicates::DiffOutcome;

// Re-export main types
pub use json::JsonReport;

/// Create `path` for writing; fails if it already exists.
///
/// # Errors
///
/// [`io::ErrorKind::AlreadyExists`] if the file exists, or any error
/// creating it.
pub fn create_output(path: &Path) -> io::Result<BufWriter<File>> {
    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    Ok(BufWriter::new(file))
}

/// Log every directory pair and file pair at warn level.
pub fn log_report(outcome: &DiffOutcome) {
    for pair in &outcome.directories {
        log::warn!(
            "Duplicate directories found:\n\tdir A: {}\n\tdir B: {}",
            pair.kept,
            pair.redundant
        );
    }
    for pair in &outcome.files {
        log::warn!(
            "Duplicate files found:\n\tfile A: {}\n\tfile B: {}",
            pair.kept,
            pair.redundant
        );
    }
    log::info!(
        "{} duplicate directories, {} duplicate files, {} hash collisions",
        outcome.directories.len(),
        outcome.files.len(),
        outcome.collisions.len()
    );
}

/// Write one purge candidate per line.
///
/// Returns the number of lines written.
///
/// # Errors
///
/// Propagates writer failures.
pub fn write_purge_list<W: Write>(candidates: &BTreeSet<String>, mut writer: W) -> io::Result<usize> {
    for candidate in candidates {
        writeln!(writer, "{candidate}")?;
    }
    writer.flush()?;
    Ok(candidates.len())
}
