//! Eligibility predicates and exclusion rules.
//!
//! A filesystem entry is eligible for indexing when it exists, is readable,
//! is not a symbolic link and is a regular file. Directories are eligible
//! for descent under the same rules with the type check swapped.
//!
//! Predicates never fail: any filesystem error while checking is treated as
//! a rejection and logged at trace level together with the reason.
//!
//! Exclusions are a separate concern handled by [`ExclusionSet`]: a set of
//! regular expressions that must match the *entire* normalized path.

use std::fs::{self, File};
use std::path::Path;

use regex::Regex;

use super::path_utils::normalize_path;

/// Pattern used as "no exclusions configured".
///
/// A set consisting only of this pattern behaves like an empty set.
pub const NOOP_PATTERN: &str = ":";

/// A single eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePredicate {
    /// The path exists (following links).
    Exists,
    /// The entry can be opened for reading.
    Readable,
    /// The entry itself is not a symbolic link.
    NotSymlink,
    /// The entry is a regular file.
    IsFile,
    /// The entry is a directory.
    IsDirectory,
}

/// Checks an entry must pass to be indexed.
pub const FILE_CHECKS: [FilePredicate; 4] = [
    FilePredicate::Exists,
    FilePredicate::Readable,
    FilePredicate::NotSymlink,
    FilePredicate::IsFile,
];

/// Checks an entry must pass to be descended into.
pub const DIRECTORY_CHECKS: [FilePredicate; 4] = [
    FilePredicate::Exists,
    FilePredicate::Readable,
    FilePredicate::NotSymlink,
    FilePredicate::IsDirectory,
];

impl FilePredicate {
    /// Evaluate the predicate, logging the rejection reason at trace level.
    #[must_use]
    pub fn test(self, path: &Path) -> bool {
        let passed = match self {
            Self::Exists => path.try_exists().unwrap_or(false),
            Self::Readable => is_readable(path),
            Self::NotSymlink => fs::symlink_metadata(path)
                .map(|m| !m.file_type().is_symlink())
                .unwrap_or(false),
            Self::IsFile => fs::metadata(path).map(|m| m.is_file()).unwrap_or(false),
            Self::IsDirectory => fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false),
        };

        if !passed {
            log::trace!("{}: {}", normalize_path(path), self.rejection_reason());
        }
        passed
    }

    fn rejection_reason(self) -> &'static str {
        match self {
            Self::Exists => "does not exist",
            Self::Readable => "is not readable",
            Self::NotSymlink => "is a symlink",
            Self::IsFile => "is not a file",
            Self::IsDirectory => "is not a directory",
        }
    }
}

fn is_readable(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(m) if m.is_dir() => fs::read_dir(path).is_ok(),
        Ok(_) => File::open(path).is_ok(),
        Err(_) => false,
    }
}

/// Run every check in order, short-circuiting on the first rejection.
#[must_use]
pub fn passes(path: &Path, checks: &[FilePredicate]) -> bool {
    checks.iter().all(|check| check.test(path))
}

/// Shorthand for [`passes`] with [`FILE_CHECKS`].
#[must_use]
pub fn is_eligible_file(path: &Path) -> bool {
    passes(path, &FILE_CHECKS)
}

/// Shorthand for [`passes`] with [`DIRECTORY_CHECKS`].
#[must_use]
pub fn is_eligible_dir(path: &Path) -> bool {
    passes(path, &DIRECTORY_CHECKS)
}

/// Errors raised while building an exclusion set.
#[derive(thiserror::Error, Debug)]
pub enum FilterError {
    /// A pattern is not a valid regular expression.
    #[error("Invalid exclusion pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern as given
        pattern: String,
        /// The regex compiler's complaint
        #[source]
        source: regex::Error,
    },
}

/// A compiled set of full-match exclusion rules.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    /// Patterns as given, in insertion order, without duplicates.
    sources: Vec<String>,
    /// Anchored versions of `sources`.
    compiled: Vec<Regex>,
}

impl ExclusionSet {
    /// An empty set; nothing is excluded.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile the given patterns. Duplicates are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidPattern`] for the first pattern that
    /// does not compile.
    pub fn new<I, S>(patterns: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            if set.sources.iter().any(|p| p == pattern) {
                continue;
            }
            // Anchor so that the whole path has to match, not a substring.
            let compiled = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
                FilterError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                }
            })?;
            set.sources.push(pattern.to_string());
            set.compiled.push(compiled);
        }
        Ok(set)
    }

    /// True when no pattern can ever exclude anything.
    #[must_use]
    pub fn is_trivial(&self) -> bool {
        self.sources.iter().all(|p| p == NOOP_PATTERN)
    }

    /// Patterns as given.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.sources
    }

    /// True if any pattern matches the whole, already normalized, path.
    #[must_use]
    pub fn is_excluded(&self, normalized: &str) -> bool {
        if self.is_trivial() {
            return false;
        }
        let excluded = self.compiled.iter().any(|re| re.is_match(normalized));
        if excluded {
            log::trace!("{}: is excluded", normalized);
        }
        excluded
    }

    /// Normalize `path` and check it against the patterns.
    #[must_use]
    pub fn excludes_path(&self, path: &Path) -> bool {
        self.is_excluded(&normalize_path(path))
    }
}
