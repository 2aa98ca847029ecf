//! Recursive listing of eligible files.
//!
//! # Overview
//!
//! [`Crawler::list`] walks a directory tree from an absolute root using an
//! explicit work stack: each directory is listed one level deep with
//! [`walkdir`], its eligible files become results, and its eligible
//! subdirectories are pushed onto the stack. Symbolic links are never
//! followed or reported.
//!
//! Exclusion rules gate files only; directories are always descended into
//! so that an excluded directory name cannot hide included files below it.
//!
//! Files accepted at each directory are reported to the run's
//! [`ProgressMonitor`] right away, so listing progress is observable before
//! indexing starts.
//!
//! # Example
//!
//! ```no_run
//! use duppur::progress::ProgressMonitor;
//! use duppur::scanner::{Crawler, ExclusionSet};
//! use std::path::Path;
//!
//! let exclusions = ExclusionSet::new([".*/\\.git/.*"]).unwrap();
//! let monitor = ProgressMonitor::silent();
//! let files = Crawler::new(&exclusions, &monitor)
//!     .list(Path::new("/srv/data"))
//!     .unwrap();
//! println!("{} files listed", files.len());
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::WalkDir;

use super::filter::{is_eligible_dir, is_eligible_file, ExclusionSet};
use super::path_utils::normalize_path;
use crate::progress::{ProgressError, ProgressMonitor};

/// Errors that abort a listing.
#[derive(thiserror::Error, Debug)]
pub enum CrawlError {
    /// The root is not an absolute path.
    #[error("Path must be absolute, it was: {0}")]
    NotAbsolute(PathBuf),

    /// The progress monitor rejected the listing report.
    #[error(transparent)]
    Progress(#[from] ProgressError),
}

/// Lists eligible files below a root.
///
/// Holds no mutable state of its own; concurrent calls for disjoint
/// subtrees only share the monitor, whose counters are atomic.
#[derive(Debug)]
pub struct Crawler<'a> {
    exclusions: &'a ExclusionSet,
    monitor: &'a ProgressMonitor,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl<'a> Crawler<'a> {
    /// Create a crawler reporting to `monitor`.
    #[must_use]
    pub fn new(exclusions: &'a ExclusionSet, monitor: &'a ProgressMonitor) -> Self {
        Self {
            exclusions,
            monitor,
            shutdown_flag: None,
        }
    }

    /// Stop descending once the flag is set; files found so far are kept.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Recursively list the normalized paths of all eligible files.
    ///
    /// An empty or unreadable root yields an empty set.
    ///
    /// # Errors
    ///
    /// [`CrawlError::NotAbsolute`] if `root` is relative;
    /// [`CrawlError::Progress`] if the monitor has already left the listing
    /// phase.
    pub fn list(&self, root: &Path) -> Result<BTreeSet<String>, CrawlError> {
        if !root.is_absolute() {
            return Err(CrawlError::NotAbsolute(root.to_path_buf()));
        }

        let mut results = BTreeSet::new();
        let mut pending: Vec<(PathBuf, usize)> = vec![(root.to_path_buf(), 1)];

        while let Some((dir, level)) = pending.pop() {
            if self.is_shutdown_requested() {
                log::debug!("Crawler: Shutdown requested, stopping descent");
                break;
            }

            let (files, subdirs) = self.list_level(&dir, level);
            self.monitor.add_files(&files)?;
            log::trace!(
                "[level: {}] {} real files in {}",
                level,
                files.len(),
                dir.display()
            );

            results.extend(files.iter().map(|f| normalize_path(f)));
            // Reverse so the stack pops subdirectories in name order.
            pending.extend(subdirs.into_iter().rev().map(|d| (d, level + 1)));
        }

        Ok(results)
    }

    /// Split one directory's entries into accepted files and subdirectories.
    fn list_level(&self, dir: &Path, level: usize) -> (Vec<PathBuf>, Vec<PathBuf>) {
        log::trace!("[level: {}] Listing {}", level, dir.display());

        let mut files = Vec::new();
        let mut subdirs = Vec::new();
        let entries = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::debug!("Cannot list entry in {}: {}", dir.display(), e);
                    continue;
                }
            };
            let path = entry.into_path();

            if is_eligible_file(&path) {
                if !self.exclusions.excludes_path(&path) {
                    files.push(path);
                }
            } else if is_eligible_dir(&path) {
                subdirs.push(path);
            }
        }

        (files, subdirs)
    }
}
