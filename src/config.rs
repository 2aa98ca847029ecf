//! Application configuration management.
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A TOML file: `--config <PATH>`, or `config.toml` in the platform
//!    configuration directory when it exists
//! 3. Environment variables prefixed with `DUPPUR_` (e.g. `DUPPUR_SORT=2`)
//! 4. Command-line flags ([`Config::merge_cli`])
//!
//! The merged [`Config`] is plain data. [`Config::validate`] resolves it
//! into [`Settings`]: the hash name is looked up in the registry, exclusion
//! patterns are compiled and ranges are checked, so a bad value fails once,
//! before any file is touched.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::CommonArgs;
use crate::index::{CodecError, SortMode};
use crate::progress::ReportInterval;
use crate::scanner::filter::{ExclusionSet, FilterError};
use crate::scanner::hasher::{HashAlgorithm, HashError};

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "DUPPUR_";

/// Errors raised while loading or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed or has the wrong shape.
    #[error("Invalid configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// The hash function is not supported.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// An exclusion pattern does not compile.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// The sort mode is out of range.
    #[error(transparent)]
    Sort(#[from] CodecError),

    /// The report interval is zero.
    #[error("Logger interval must be at least 1 second")]
    InvalidInterval,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hash function name.
    pub hash_function: String,
    /// Index sort mode (0 none, 1 hash, 2 path).
    pub sort: u8,
    /// Hash files in parallel.
    pub parallel: bool,
    /// Fold mirrored directories in duplicate reports.
    pub consolidate_directories: bool,
    /// Seconds between progress reports; none disables them.
    pub logger_interval_secs: Option<u64>,
    /// Exclusion patterns.
    pub excludes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hash_function: HashAlgorithm::default().name().to_string(),
            sort: SortMode::default() as u8,
            parallel: false,
            consolidate_directories: false,
            logger_interval_secs: None,
            excludes: Vec::new(),
        }
    }
}

/// Validated, ready-to-use settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Resolved digest
    pub algorithm: HashAlgorithm,
    /// Resolved sort mode
    pub sort: SortMode,
    /// Parallel hashing
    pub parallel: bool,
    /// Directory consolidation
    pub consolidate_directories: bool,
    /// Progress report interval
    pub interval: ReportInterval,
    /// Compiled exclusion patterns
    pub exclusions: ExclusionSet,
}

impl Config {
    /// Load defaults, the TOML file and the environment.
    ///
    /// With `explicit`, that file must exist. Without it, the platform
    /// default file is used when present.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NotFound`] for a missing explicit file;
    /// [`ConfigError::Load`] if a layer cannot be parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) if !path.is_file() => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|p| p.is_file()),
        };

        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = &file {
            log::debug!("Loading configuration from {}", file.display());
            figment = figment.merge(Toml::file(file));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Default platform-specific configuration file path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "duppur").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply command-line flags on top of the loaded values.
    ///
    /// Flags only ever switch features on; exclusions are appended.
    #[must_use]
    pub fn merge_cli(mut self, args: &CommonArgs) -> Self {
        if let Some(name) = &args.hash_function {
            self.hash_function.clone_from(name);
        }
        if let Some(sort) = args.sort {
            self.sort = sort;
        }
        if let Some(secs) = args.logger_interval {
            self.logger_interval_secs = Some(secs);
        }
        self.parallel |= args.parallel;
        self.consolidate_directories |= args.consolidate_directories;
        self.excludes.extend(args.excludes.iter().cloned());
        self
    }

    /// Resolve into [`Settings`].
    ///
    /// # Errors
    ///
    /// [`ConfigError::Hash`] for an unknown hash function,
    /// [`ConfigError::Filter`] for an invalid pattern,
    /// [`ConfigError::Sort`] for a sort mode above 2 and
    /// [`ConfigError::InvalidInterval`] for a zero interval.
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        if self.logger_interval_secs == Some(0) {
            return Err(ConfigError::InvalidInterval);
        }
        Ok(Settings {
            algorithm: HashAlgorithm::from_name(&self.hash_function)?,
            sort: SortMode::try_from(self.sort)?,
            parallel: self.parallel,
            consolidate_directories: self.consolidate_directories,
            interval: ReportInterval::from_secs(self.logger_interval_secs),
            exclusions: ExclusionSet::new(&self.excludes)?,
        })
    }

    /// Log the effective options at debug level.
    pub fn log_options(&self) {
        log::debug!("Options:");
        log::debug!("\thash function: {}", self.hash_function);
        log::debug!("\tsort mode: {}", self.sort);
        log::debug!("\tparallel: {}", self.parallel);
        log::debug!("\tconsolidate directories: {}", self.consolidate_directories);
        match self.logger_interval_secs {
            Some(secs) => log::debug!("\tlogger interval: {}s", secs),
            None => log::debug!("\tlogger interval: unbounded"),
        }
        for pattern in &self.excludes {
            log::debug!("\texclude: {}", pattern);
        }
    }
}
