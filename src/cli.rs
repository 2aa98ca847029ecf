//! Command-line interface definitions for duppur.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, configuration file, error format) apply to every subcommand;
//! the options shared by all subcommands live in [`CommonArgs`].
//!
//! # Example
//!
//! ```bash
//! # Index a tree and report duplicates
//! duppur index /srv/data -d
//!
//! # Index in parallel with MD5 and write the index sorted by path
//! duppur index /srv/data -p -@ md5 -s 2 -o /tmp/data.idx
//!
//! # Verify a stored index
//! duppur check /tmp/data.idx
//!
//! # List what in /srv/backup duplicates /srv/data
//! duppur purge-list /tmp/data.idx /tmp/backup.idx -n
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Content-hash indexer and duplicate purger.
///
/// duppur indexes file trees by content hash, verifies stored indexes and
/// lists byte-identical duplicates, optionally folded into whole directories.
#[derive(Debug, Parser)]
#[command(name = "duppur")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only show warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (TOML) instead of the platform default
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for duppur.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Index a directory tree by content hash
    Index(IndexArgs),
    /// Re-hash the files of a stored index and verify them
    Check(CheckArgs),
    /// Drop entries of a stored index whose files are gone
    Update(UpdateArgs),
    /// List files and directories of one index duplicated in another
    PurgeList(PurgeListArgs),
}

impl Commands {
    /// Options shared by every subcommand.
    #[must_use]
    pub fn common(&self) -> &CommonArgs {
        match self {
            Self::Index(args) => &args.common,
            Self::Check(args) => &args.common,
            Self::Update(args) => &args.common,
            Self::PurgeList(args) => &args.common,
        }
    }
}

/// Options shared by all subcommands.
///
/// Unset options fall back to the configuration file and environment.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Regular expression matched against the whole normalized path
    ///
    /// Can be specified multiple times. Matching files are not indexed and
    /// are never chosen as the kept copy of a duplicate.
    #[arg(short = 'e', long = "exclude", value_name = "REGEX")]
    pub excludes: Vec<String>,

    /// Hash function: md5, sha-224, sha-256, sha-384, sha-512 or blake3
    #[arg(short = '@', long, value_name = "NAME")]
    pub hash_function: Option<String>,

    /// Hash files in parallel
    #[arg(short, long)]
    pub parallel: bool,

    /// Index sort mode: 0 none, 1 by hash, 2 by path
    #[arg(short, long, value_name = "MODE", value_parser = clap::value_parser!(u8).range(0..=2))]
    pub sort: Option<u8>,

    /// Report mirrored directories instead of each of their files
    #[arg(short = 'n', long)]
    pub consolidate_directories: bool,

    /// Seconds between progress reports (no periodic reports if unset)
    #[arg(short = 'l', long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub logger_interval: Option<u64>,

    /// Print the duplicate report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the index subcommand.
#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Absolute path of the directory to index
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Report duplicates found in the new index
    #[arg(short = 'd', long)]
    pub check_duplicates: bool,

    /// Write the index to this file, which must not exist yet
    #[arg(short = 'o', long = "write-output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Arguments for the check subcommand.
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Index file to verify
    #[arg(value_name = "INDEX_FILE")]
    pub index_file: PathBuf,

    /// Report duplicates among the verified entries
    #[arg(short = 'd', long)]
    pub check_duplicates: bool,

    /// Write the verified index to this file, which must not exist yet
    #[arg(short = 'o', long = "write-output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Arguments for the update subcommand.
#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Index file to prune
    #[arg(value_name = "INDEX_FILE")]
    pub index_file: PathBuf,

    /// Write the pruned index here instead of replacing INDEX_FILE
    #[arg(short = 'o', long = "write-output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Arguments for the purge-list subcommand.
#[derive(Debug, Args)]
pub struct PurgeListArgs {
    /// Absolute path of the index whose files are kept
    #[arg(value_name = "PRIMARY")]
    pub primary: PathBuf,

    /// Absolute path of the index checked for redundant copies
    #[arg(value_name = "PURGATORY")]
    pub purgatory: PathBuf,

    /// Write the purge list to this file instead of stdout
    #[arg(short = 'o', long = "write-output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}
