//! duppur - content-hash indexer and duplicate purger
//!
//! Indexes file trees by content hash into a durable line-oriented format,
//! verifies stored indexes against the files they describe, and finds
//! byte-identical duplicates within one index or between two, optionally
//! folding mirrored directories into a single report entry.
//!
//! Each run is driven by [`run_app`]: it builds the run's
//! [`ProgressMonitor`](progress::ProgressMonitor), hands it by reference to
//! the crawler and the indexer, and tears it down when the run ends.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod index;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::cli::{CheckArgs, Cli, Commands, IndexArgs, PurgeListArgs, UpdateArgs};
use crate::config::{Config, Settings};
use crate::duplicates::{DiffOutcome, DuplicateEngine};
use crate::error::ExitCode;
use crate::index::{codec, ContentIndexer, Index, IndexerConfig};
use crate::output::JsonReport;
use crate::progress::ProgressMonitor;
use crate::scanner::Crawler;
use crate::signal::ShutdownHandler;

/// Run the application for parsed arguments.
///
/// # Errors
///
/// Returns an error for usage problems (invalid configuration, relative
/// roots, existing output files, malformed index files) and for I/O
/// failures on the index files themselves. Per-file problems inside a run
/// are logged and reflected in the returned [`ExitCode`] instead.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    let handler = signal::install_handler()?;

    let config = Config::load(cli.config.as_deref())?.merge_cli(cli.command.common());
    config.log_options();
    let settings = config.validate()?;

    let code = match &cli.command {
        Commands::Index(args) => run_index(args, &settings, &handler)?,
        Commands::Check(args) => run_check(args, &settings, &handler)?,
        Commands::Update(args) => run_update(args, &settings)?,
        Commands::PurgeList(args) => run_purge_list(args, &settings)?,
    };

    if handler.is_shutdown_requested() {
        return Ok(code.worst(ExitCode::Interrupted));
    }
    Ok(code)
}

fn indexer_config(settings: &Settings, handler: &ShutdownHandler) -> IndexerConfig {
    IndexerConfig::default()
        .with_algorithm(settings.algorithm)
        .with_parallel(settings.parallel)
        .with_shutdown_flag(handler.get_flag())
}

fn run_index(args: &IndexArgs, settings: &Settings, handler: &ShutdownHandler) -> Result<ExitCode> {
    if !(args.check_duplicates || args.output.is_some()) {
        bail!(
            "When creating an index, it must be used either to check for duplicates (-d) or to write an output (-o)"
        );
    }
    ensure_output_free(args.output.as_deref())?;

    let monitor = ProgressMonitor::new(settings.interval);
    let files = Crawler::new(&settings.exclusions, &monitor)
        .with_shutdown_flag(handler.get_flag())
        .list(&args.root)?;
    log::info!(
        "{} files listed recursively in {}",
        files.len(),
        args.root.display()
    );

    let index = ContentIndexer::new(indexer_config(settings, handler), &settings.exclusions, &monitor)
        .build_index(&files)?;
    trace_index(&index);

    let mut code = ExitCode::Success;
    if args.check_duplicates {
        code = code.worst(report_duplicates(&index, settings, args.common.json)?);
    }
    if let Some(path) = &args.output {
        write_index(&index, settings, path)?;
    }
    Ok(code)
}

fn run_check(args: &CheckArgs, settings: &Settings, handler: &ShutdownHandler) -> Result<ExitCode> {
    ensure_output_free(args.output.as_deref())?;
    let stored = read_index_lines(&args.index_file)?;
    log::info!(
        "{} files listed in index {}",
        stored.len(),
        args.index_file.display()
    );

    let monitor = ProgressMonitor::new(settings.interval);
    let verification =
        ContentIndexer::new(indexer_config(settings, handler), &settings.exclusions, &monitor)
            .verify(stored)?;

    let mut code = if verification.failed > 0 {
        ExitCode::IntegrityFailure
    } else {
        ExitCode::Success
    };
    if args.check_duplicates {
        code = code.worst(report_duplicates(&verification.index, settings, args.common.json)?);
    }
    if let Some(path) = &args.output {
        write_index(&verification.index, settings, path)?;
    }
    Ok(code)
}

fn run_update(args: &UpdateArgs, settings: &Settings) -> Result<ExitCode> {
    ensure_output_free(args.output.as_deref())?;
    let index = read_index(&args.index_file)?;
    log::info!(
        "{} files listed in index {}",
        index.file_count(),
        args.index_file.display()
    );

    let monitor = ProgressMonitor::silent();
    let indexer = ContentIndexer::new(IndexerConfig::default(), &settings.exclusions, &monitor);
    let pruned = indexer.prune_missing(index);

    log::info!("{} entries kept, {} removed", pruned.kept, pruned.removed);

    match &args.output {
        Some(path) => write_index(&pruned.index, settings, path)?,
        None => replace_index(&pruned.index, settings, &args.index_file)?,
    }
    Ok(ExitCode::Success)
}

fn run_purge_list(args: &PurgeListArgs, settings: &Settings) -> Result<ExitCode> {
    for path in [&args.primary, &args.purgatory] {
        if !path.is_absolute() {
            bail!("Path must be absolute, it was: {}", path.display());
        }
    }
    ensure_output_free(args.output.as_deref())?;

    let primary = read_index(&args.primary)?;
    let purgatory = read_index(&args.purgatory)?;
    log::info!(
        "Comparing {} files of {} against {} files of {}",
        purgatory.file_count(),
        args.purgatory.display(),
        primary.file_count(),
        args.primary.display()
    );

    let outcome = engine(settings).diff(&primary, &purgatory);
    let code = outcome_code(&outcome);
    output::log_report(&outcome);
    if args.common.json {
        JsonReport::new(&outcome, code).write_to(io::stdout().lock())?;
    }

    let candidates = outcome.purge_candidates();
    let written = match &args.output {
        Some(path) => write_new_file(path, |writer| {
            output::write_purge_list(&candidates, writer).map_err(anyhow::Error::from)
        })?,
        None if args.common.json => candidates.len(),
        None => output::write_purge_list(&candidates, io::stdout().lock())?,
    };
    log::info!("{} purge candidates listed", written);
    Ok(code)
}

fn engine(settings: &Settings) -> DuplicateEngine<'_> {
    DuplicateEngine::new(&settings.exclusions).with_consolidation(settings.consolidate_directories)
}

fn outcome_code(outcome: &DiffOutcome) -> ExitCode {
    if outcome.collisions.is_empty() {
        ExitCode::Success
    } else {
        ExitCode::IntegrityFailure
    }
}

fn report_duplicates(index: &Index, settings: &Settings, json: bool) -> Result<ExitCode> {
    let outcome = engine(settings).find_duplicates(index);
    let code = outcome_code(&outcome);
    output::log_report(&outcome);
    if json {
        JsonReport::new(&outcome, code).write_to(io::stdout().lock())?;
    }
    Ok(code)
}

/// Fail before any work if an output file is already there.
fn ensure_output_free(path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        if path.try_exists().unwrap_or(true) {
            bail!("Output file {} already exists", path.display());
        }
    }
    Ok(())
}

/// Create `path`, fill it with `fill`, and remove it again if filling fails.
fn write_new_file<T>(
    path: &Path,
    fill: impl FnOnce(io::BufWriter<File>) -> Result<T>,
) -> Result<T> {
    let writer = output::create_output(path)
        .with_context(|| format!("Cannot create output file {}", path.display()))?;
    fill(writer).map_err(|err| {
        if let Err(e) = fs::remove_file(path) {
            log::warn!("Cannot remove incomplete file {}: {}", path.display(), e);
        }
        err
    })
}

fn read_index_lines(path: &Path) -> Result<Vec<(String, String)>> {
    let file = File::open(path).with_context(|| format!("Cannot open index file {}", path.display()))?;
    codec::read_lines(BufReader::new(file))
        .with_context(|| format!("Cannot read index file {}", path.display()))
}

fn read_index(path: &Path) -> Result<Index> {
    Ok(read_index_lines(path)?.into_iter().collect())
}

fn write_index(index: &Index, settings: &Settings, path: &Path) -> Result<()> {
    log::info!("Writing index into {}", path.display());
    let lines = write_new_file(path, |writer| {
        codec::write(index, settings.sort, writer)
            .with_context(|| format!("Cannot write index file {}", path.display()))
    })?;
    log::info!("Index written into {} ({} lines)", path.display(), lines);
    Ok(())
}

/// Write next to `path`, then move over it.
fn replace_index(index: &Index, settings: &Settings, path: &Path) -> Result<()> {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".new");
    let staging = PathBuf::from(staging);

    write_index(index, settings, &staging)?;
    if let Err(e) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(e).with_context(|| format!("Cannot replace index file {}", path.display()));
    }
    log::info!("Index {} updated", path.display());
    Ok(())
}

fn trace_index(index: &Index) {
    if !log::log_enabled!(log::Level::Trace) {
        return;
    }
    let sorted: BTreeMap<&str, &[String]> = index.iter().collect();
    for (hash, paths) in sorted {
        log::trace!("{} : {:?}", hash, paths);
    }
}
