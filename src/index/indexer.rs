//! Building and verifying content indexes.
//!
//! [`ContentIndexer`] turns a listed path set into an [`Index`] by hashing
//! every file that is still eligible, and re-hashes a stored index to
//! confirm that its entries still match their files.
//!
//! # Concurrency
//!
//! With `parallel` set, hashing runs on a dedicated rayon pool sized to the
//! available hardware parallelism. Workers only compute digests; the
//! `(path, hash)` results are collected and grouped on the calling thread,
//! so no insertion into the index is ever lost. Progress counters are
//! updated from the workers through the monitor's atomics.
//!
//! # Failure policy
//!
//! A file that cannot be read is logged and skipped. A shutdown request
//! stops new files from being hashed; files hashed before it stay in the
//! result.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use super::Index;
use crate::progress::{format_duration, ProgressError, ProgressMonitor};
use crate::scanner::filter::{is_eligible_file, ExclusionSet};
use crate::scanner::hasher::HashAlgorithm;

/// Errors that abort an indexing run.
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// The hashing pool could not be created.
    #[error("Failed to create hashing thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The progress monitor was used out of phase.
    #[error(transparent)]
    Progress(#[from] ProgressError),
}

/// Settings for a [`ContentIndexer`].
#[derive(Debug, Clone, Default)]
pub struct IndexerConfig {
    /// Digest used for every file
    pub algorithm: HashAlgorithm,
    /// Hash on a worker pool instead of the calling thread
    pub parallel: bool,
    /// Set to stop scheduling new files
    pub shutdown_flag: Option<Arc<AtomicBool>>,
}

impl IndexerConfig {
    /// Set the digest.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Enable or disable parallel hashing.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the shutdown flag for graceful interruption.
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
}

/// Outcome of re-hashing a stored index.
#[derive(Debug, Clone, Default)]
pub struct Verification {
    /// Entries whose current content still hashes to the stored value
    pub index: Index,
    /// Number of matching entries
    pub ok: usize,
    /// Number of entries whose content changed
    pub failed: usize,
    /// Entries that were not eligible or could not be read
    pub skipped: usize,
}

/// Outcome of [`ContentIndexer::prune_missing`].
#[derive(Debug, Clone, Default)]
pub struct Pruned {
    /// Entries whose files are still eligible
    pub index: Index,
    /// Number of entries kept
    pub kept: usize,
    /// Number of entries dropped
    pub removed: usize,
}

/// Hashes files into an [`Index`], reporting to a [`ProgressMonitor`].
#[derive(Debug)]
pub struct ContentIndexer<'a> {
    config: IndexerConfig,
    exclusions: &'a ExclusionSet,
    monitor: &'a ProgressMonitor,
}

impl<'a> ContentIndexer<'a> {
    /// Create an indexer.
    #[must_use]
    pub fn new(
        config: IndexerConfig,
        exclusions: &'a ExclusionSet,
        monitor: &'a ProgressMonitor,
    ) -> Self {
        Self {
            config,
            exclusions,
            monitor,
        }
    }

    /// Hash every eligible, non-excluded path into a new index.
    ///
    /// Ends the monitor's listing phase before hashing and stops it when
    /// done.
    ///
    /// # Errors
    ///
    /// [`IndexError::Progress`] if the monitor has already left the listing
    /// phase; [`IndexError::ThreadPool`] if a parallel run cannot start.
    pub fn build_index<I, S>(&self, paths: I) -> Result<Index, IndexError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let candidates: Vec<String> = paths
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .filter(|p| self.accepts(p))
            .collect();

        self.monitor.end_listing()?;
        let start = Instant::now();
        let hashes = self.hash_all(&candidates);
        self.monitor.stop();
        let hashes = hashes?;

        let mut index = Index::new();
        for (path, hash) in candidates.iter().zip(hashes) {
            if let Some(hash) = hash {
                index.insert(hash, path);
            }
        }

        log::info!(
            "{} files indexed into {} hashes in {}",
            index.file_count(),
            index.len(),
            format_duration(start.elapsed())
        );
        self.warn_if_interrupted(candidates.len(), index.file_count());
        Ok(index)
    }

    /// Re-hash stored `(hash, path)` pairs and keep those that still match.
    ///
    /// Excluded paths are dropped before hashing. A path whose fresh digest
    /// equals the stored one (ignoring case) is kept under the fresh
    /// digest; a path whose digest changed is logged and dropped. The
    /// monitor is taken through its full lifecycle.
    ///
    /// # Errors
    ///
    /// As [`build_index`](Self::build_index).
    pub fn verify(&self, stored: Vec<(String, String)>) -> Result<Verification, IndexError> {
        let stored: Vec<(String, String)> = stored
            .into_iter()
            .filter(|(_, path)| !self.exclusions.is_excluded(path))
            .collect();

        let mut verification = Verification::default();
        let mut candidates = Vec::with_capacity(stored.len());
        for (hash, path) in stored {
            if is_eligible_file(Path::new(&path)) {
                candidates.push((hash, path));
            } else {
                log::error!("SKIP {}: not an eligible file", path);
                verification.skipped += 1;
            }
        }

        let paths: Vec<String> = candidates.iter().map(|(_, p)| p.clone()).collect();
        self.monitor.add_files(&paths)?;
        self.monitor.end_listing()?;
        let start = Instant::now();
        let hashes = self.hash_all(&paths);
        self.monitor.stop();
        let hashes = hashes?;

        for ((stored_hash, path), fresh) in candidates.into_iter().zip(hashes) {
            let Some(fresh) = fresh else {
                verification.skipped += 1;
                continue;
            };
            if fresh.eq_ignore_ascii_case(&stored_hash) {
                log::info!("OK {}", path);
                verification.ok += 1;
                verification.index.insert(fresh, &path);
            } else {
                log::error!(
                    "FAIL {}: stored hash {}, current hash {}",
                    path,
                    stored_hash,
                    fresh
                );
                verification.failed += 1;
            }
        }

        log::info!(
            "{} files re-indexed in {}",
            verification.index.file_count(),
            format_duration(start.elapsed())
        );
        if verification.failed > 0 {
            log::error!(
                "Verification finished: {} OK, {} FAIL, {} skipped",
                verification.ok,
                verification.failed,
                verification.skipped
            );
        } else {
            log::info!(
                "Verification finished: {} OK, {} FAIL, {} skipped",
                verification.ok,
                verification.failed,
                verification.skipped
            );
        }
        self.warn_if_interrupted(paths.len(), verification.ok + verification.failed);
        Ok(verification)
    }

    /// [`verify`](Self::verify), keeping only the confirmed index.
    ///
    /// # Errors
    ///
    /// As [`verify`](Self::verify).
    pub fn reindex(&self, stored: Vec<(String, String)>) -> Result<Index, IndexError> {
        self.verify(stored).map(|v| v.index)
    }

    /// Drop entries whose files are gone, no longer eligible, or excluded.
    ///
    /// Nothing is re-hashed and the monitor is not used.
    #[must_use]
    pub fn prune_missing(&self, mut index: Index) -> Pruned {
        let removed = index.retain(|_, path| {
            let keep = self.accepts(path);
            if !keep {
                log::debug!("Removing {} from the index", path);
            }
            keep
        });
        let kept = index.file_count();
        log::info!("Index pruned: {} entries kept, {} removed", kept, removed);
        Pruned {
            index,
            kept,
            removed,
        }
    }

    fn accepts(&self, path: &str) -> bool {
        is_eligible_file(Path::new(path)) && !self.exclusions.is_excluded(path)
    }

    /// Digest for each path, aligned with the input; `None` when skipped.
    fn hash_all(&self, paths: &[String]) -> Result<Vec<Option<String>>, IndexError> {
        if !self.config.parallel {
            return Ok(paths
                .iter()
                .map(|p| self.hash_one(p))
                .collect::<Result<Vec<_>, _>>()?);
        }

        let pool = build_pool()?;
        let hashes = pool.install(|| {
            paths
                .par_iter()
                .map(|p| self.hash_one(p))
                .collect::<Result<Vec<_>, _>>()
        })?;
        Ok(hashes)
    }

    fn hash_one(&self, path: &str) -> Result<Option<String>, ProgressError> {
        if self.config.is_shutdown_requested() {
            log::trace!("Shutdown requested, skipping {}", path);
            return Ok(None);
        }

        let file = Path::new(path);
        match self.config.algorithm.hash_file(file) {
            Ok(hash) => {
                self.monitor.mark_processed(file)?;
                log::trace!("{} *{}", hash, path);
                Ok(Some(hash))
            }
            Err(e) => {
                log::error!("Failed to hash {}: {}", path, e);
                Ok(None)
            }
        }
    }

    fn warn_if_interrupted(&self, scheduled: usize, done: usize) {
        if self.config.is_shutdown_requested() && done < scheduled {
            log::warn!(
                "Interrupted, {} of {} files were not processed",
                scheduled - done,
                scheduled
            );
        }
    }
}

/// Build a hashing pool bounded by the available parallelism.
fn build_pool() -> Result<rayon::ThreadPool, IndexError> {
    let threads = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);

    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("duppur-hash-{i}"))
        .build()
        .or_else(|e| {
            log::warn!(
                "Failed to create hashing pool with {} threads ({}), using defaults",
                threads,
                e
            );
            rayon::ThreadPoolBuilder::new().build()
        })
        .map_err(IndexError::from)
}
