//! Run-scoped progress tracking with a background reporter.
//!
//! A [`ProgressMonitor`] is created by the session that owns a crawl/index
//! run and handed by reference to the crawler and the indexer. It moves
//! through three phases, one way only:
//!
//! ```text
//! Listing ──end_listing()──▶ Processing ──stop()──▶ Stopped
//! ```
//!
//! While listing, [`ProgressMonitor::add_files`] accumulates file count and
//! total size. While processing, [`ProgressMonitor::mark_processed`]
//! accumulates processed count and size. Calling either in the wrong phase
//! is a caller bug and returns [`ProgressError::PhaseViolation`].
//!
//! When created with a reporting interval, a reporter thread logs running
//! totals (listing) or percentages and an ETA (processing) every interval.
//! Its sleep is a `recv_timeout` on a cancellation channel, so `stop()` and
//! `Drop` end it without waiting out the interval.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

use crate::scanner::filter::is_eligible_file;

/// Lifecycle phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Files are being discovered.
    Listing,
    /// Files are being hashed.
    Processing,
    /// The run is over.
    Stopped,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Listing,
            1 => Self::Processing,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Listing => "listing",
            Self::Processing => "processing",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Misuse of the monitor's phase protocol.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgressError {
    /// An operation was called outside the phase it belongs to.
    #[error("{operation} is only valid while {expected}, but the monitor is {actual}")]
    PhaseViolation {
        /// The operation that was attempted
        operation: &'static str,
        /// Phase the operation requires
        expected: Phase,
        /// Phase the monitor was in
        actual: Phase,
    },
}

/// How often the reporter logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportInterval {
    /// Never report periodically; counters are still tracked.
    #[default]
    Unbounded,
    /// Report once per interval.
    Every(Duration),
}

impl ReportInterval {
    /// Interval from a number of seconds; `None` means unbounded.
    #[must_use]
    pub fn from_secs(secs: Option<u64>) -> Self {
        match secs {
            Some(s) if s > 0 => Self::Every(Duration::from_secs(s)),
            _ => Self::Unbounded,
        }
    }
}

/// Counters shared between the owning run and the reporter thread.
#[derive(Debug)]
struct Counters {
    phase: AtomicU8,
    file_count: AtomicU64,
    cumulative_size: AtomicU64,
    processed_count: AtomicU64,
    processed_size: AtomicU64,
    created_at: Instant,
    processing_started_at: OnceLock<Instant>,
}

impl Counters {
    fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    /// Compare-and-swap from `from` to `to`.
    fn transition(&self, from: Phase, to: Phase) -> Result<(), Phase> {
        self.phase
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(Phase::from_u8)
    }

    fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            phase: self.phase(),
            file_count: self.file_count.load(Ordering::Relaxed),
            cumulative_size: self.cumulative_size.load(Ordering::Relaxed),
            processed_count: self.processed_count.load(Ordering::Relaxed),
            processed_size: self.processed_size.load(Ordering::Relaxed),
            listing_elapsed: self.created_at.elapsed(),
            processing_elapsed: self.processing_started_at.get().map(Instant::elapsed),
        }
    }
}

/// Point-in-time copy of the monitor's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Current phase
    pub phase: Phase,
    /// Files counted while listing
    pub file_count: u64,
    /// Bytes counted while listing
    pub cumulative_size: u64,
    /// Files marked processed
    pub processed_count: u64,
    /// Bytes marked processed
    pub processed_size: u64,
    /// Time since the monitor was created
    pub listing_elapsed: Duration,
    /// Time since listing ended, if it has
    pub processing_elapsed: Option<Duration>,
}

impl ProgressSnapshot {
    /// Fraction of listed files processed, `None` if nothing was listed.
    #[must_use]
    pub fn file_ratio(&self) -> Option<f64> {
        ratio(self.processed_count, self.file_count)
    }

    /// Fraction of listed bytes processed, `None` if nothing was listed.
    #[must_use]
    pub fn byte_ratio(&self) -> Option<f64> {
        ratio(self.processed_size, self.cumulative_size)
    }

    /// Remaining time, extrapolated from processed bytes.
    ///
    /// `elapsed * (total / processed) - elapsed`; `None` until at least one
    /// byte has been processed.
    #[must_use]
    pub fn estimated_remaining(&self) -> Option<Duration> {
        let elapsed = self.processing_elapsed?;
        estimate_remaining(elapsed, self.processed_size, self.cumulative_size)
    }
}

fn ratio(part: u64, whole: u64) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(part as f64 / whole as f64)
    }
}

/// ETA from elapsed time and processed/total bytes.
///
/// Returns `None` when `processed_bytes` is zero.
#[must_use]
pub fn estimate_remaining(
    elapsed: Duration,
    processed_bytes: u64,
    total_bytes: u64,
) -> Option<Duration> {
    if processed_bytes == 0 {
        return None;
    }
    let elapsed_secs = elapsed.as_secs_f64();
    let projected = elapsed_secs * (total_bytes as f64 / processed_bytes as f64);
    let remaining = (projected - elapsed_secs).max(0.0);
    Some(Duration::from_secs_f64(remaining))
}

/// Progress tracker for a single crawl/index run.
#[derive(Debug)]
pub struct ProgressMonitor {
    counters: Arc<Counters>,
    cancel: Mutex<Option<Sender<()>>>,
    reporter: Mutex<Option<JoinHandle<()>>>,
}

impl ProgressMonitor {
    /// Create a monitor in the `Listing` phase.
    ///
    /// With [`ReportInterval::Every`], a reporter thread is spawned that
    /// lives until [`stop`](Self::stop) or drop.
    #[must_use]
    pub fn new(interval: ReportInterval) -> Self {
        let counters = Arc::new(Counters {
            phase: AtomicU8::new(Phase::Listing as u8),
            file_count: AtomicU64::new(0),
            cumulative_size: AtomicU64::new(0),
            processed_count: AtomicU64::new(0),
            processed_size: AtomicU64::new(0),
            created_at: Instant::now(),
            processing_started_at: OnceLock::new(),
        });

        let (cancel, reporter) = match interval {
            ReportInterval::Unbounded => (None, None),
            ReportInterval::Every(period) => {
                let (tx, rx) = bounded::<()>(1);
                let shared = Arc::clone(&counters);
                let spawned = std::thread::Builder::new()
                    .name("duppur-progress".to_string())
                    .spawn(move || loop {
                        match rx.recv_timeout(period) {
                            Err(RecvTimeoutError::Timeout) => {
                                let snapshot = shared.snapshot();
                                if snapshot.phase == Phase::Stopped {
                                    break;
                                }
                                report(&snapshot);
                            }
                            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                                log::trace!("Progress reporter cancelled, ending thread");
                                break;
                            }
                        }
                    });
                match spawned {
                    Ok(handle) => (Some(tx), Some(handle)),
                    Err(e) => {
                        log::warn!("Failed to start progress reporter: {}", e);
                        (None, None)
                    }
                }
            }
        };

        Self {
            counters,
            cancel: Mutex::new(cancel),
            reporter: Mutex::new(reporter),
        }
    }

    /// A monitor that never reports periodically.
    #[must_use]
    pub fn silent() -> Self {
        Self::new(ReportInterval::Unbounded)
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.counters.phase()
    }

    /// Current counters.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.counters.snapshot()
    }

    /// Count eligible regular files from `paths` into the listing totals.
    ///
    /// # Errors
    ///
    /// [`ProgressError::PhaseViolation`] outside the `Listing` phase.
    pub fn add_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<(), ProgressError> {
        self.require(Phase::Listing, "add_files")?;

        let mut count = 0u64;
        let mut size = 0u64;
        for path in paths {
            let path = path.as_ref();
            if !is_eligible_file(path) {
                continue;
            }
            count += 1;
            size += std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        }

        self.counters.file_count.fetch_add(count, Ordering::Relaxed);
        self.counters.cumulative_size.fetch_add(size, Ordering::Relaxed);
        log::debug!(
            "{} files (with cumulative size {}) added to the monitor",
            count,
            ByteSize(size)
        );
        Ok(())
    }

    /// Leave the `Listing` phase.
    ///
    /// # Errors
    ///
    /// [`ProgressError::PhaseViolation`] if listing has already ended.
    pub fn end_listing(&self) -> Result<(), ProgressError> {
        self.counters
            .transition(Phase::Listing, Phase::Processing)
            .map_err(|actual| ProgressError::PhaseViolation {
                operation: "end_listing",
                expected: Phase::Listing,
                actual,
            })?;
        let _ = self.counters.processing_started_at.set(Instant::now());

        let snapshot = self.snapshot();
        log::info!(
            "Listing ended, counted {} files (with total size {})",
            snapshot.file_count,
            ByteSize(snapshot.cumulative_size)
        );
        Ok(())
    }

    /// Record one processed file, adding its current size.
    ///
    /// # Errors
    ///
    /// [`ProgressError::PhaseViolation`] outside the `Processing` phase.
    pub fn mark_processed(&self, path: &Path) -> Result<(), ProgressError> {
        self.require(Phase::Processing, "mark_processed")?;

        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        self.counters.processed_count.fetch_add(1, Ordering::Relaxed);
        self.counters.processed_size.fetch_add(size, Ordering::Relaxed);
        log::trace!(
            "File {} (with size {}) marked as processed",
            path.display(),
            ByteSize(size)
        );
        Ok(())
    }

    /// Enter the `Stopped` phase and shut the reporter down.
    ///
    /// Idempotent: stopping a stopped monitor does nothing.
    pub fn stop(&self) {
        let previous = Phase::from_u8(
            self.counters
                .phase
                .swap(Phase::Stopped as u8, Ordering::SeqCst),
        );
        self.shutdown_reporter();

        if previous != Phase::Stopped {
            let snapshot = self.snapshot();
            log::info!(
                "Indexing finished, indexed {} files (with total size of {})",
                snapshot.processed_count,
                ByteSize(snapshot.processed_size)
            );
        }
    }

    fn require(&self, expected: Phase, operation: &'static str) -> Result<(), ProgressError> {
        let actual = self.phase();
        if actual == expected {
            Ok(())
        } else {
            Err(ProgressError::PhaseViolation {
                operation,
                expected,
                actual,
            })
        }
    }

    fn shutdown_reporter(&self) {
        if let Some(tx) = self.cancel.lock().ok().and_then(|mut guard| guard.take()) {
            let _ = tx.try_send(());
        }
        let handle = self.reporter.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::warn!("Progress reporter thread panicked");
            }
        }
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        self.shutdown_reporter();
    }
}

fn report(snapshot: &ProgressSnapshot) {
    match snapshot.phase {
        Phase::Listing => log::info!(
            "Still listing, currently @ {} files (with total size {}), elapsed time: {}",
            snapshot.file_count,
            ByteSize(snapshot.cumulative_size),
            format_duration(snapshot.listing_elapsed)
        ),
        Phase::Processing => {
            let elapsed = snapshot.processing_elapsed.unwrap_or_default();
            log::info!(
                "[{}/{}] Still indexing, currently @ {} files out of {} (with processed size {} out of {}), elapsed time: {}, estimated time left: {}",
                format_percent(snapshot.file_ratio()),
                format_percent(snapshot.byte_ratio()),
                snapshot.processed_count,
                snapshot.file_count,
                ByteSize(snapshot.processed_size),
                ByteSize(snapshot.cumulative_size),
                format_duration(elapsed),
                snapshot
                    .estimated_remaining()
                    .map_or_else(|| "unknown".to_string(), format_duration)
            );
        }
        Phase::Stopped => {}
    }
}

/// Render a ratio as a percentage with four decimals, `--` when undefined.
#[must_use]
pub fn format_percent(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{:07.4}%", r * 100.0),
        None => "--".to_string(),
    }
}

/// Render a duration as `HH:MM:SS.mmm`. Hours are not capped at 24.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    let hours = millis / 3_600_000;
    let minutes = (millis / 60_000) % 60;
    let seconds = (millis / 1_000) % 60;
    let rest = millis % 1_000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{rest:03}")
}
