//! Diffing indexes into verified duplicates.
//!
//! # Overview
//!
//! [`DuplicateEngine::diff`] compares a primary (keep) index against a
//! purgatory index; self-duplicate detection passes the same index twice.
//! For each hash group in the primary index:
//!
//! 1. A representative is chosen: the lexicographically first path of the
//!    group that no exclusion pattern matches. Groups without one are
//!    skipped.
//! 2. Every purgatory path under the same hash, other than the
//!    representative itself, is compared byte for byte with it. Equal
//!    files become a [`DuplicatePair`]; unequal files are a hash collision,
//!    which is logged at error level and never reported as a duplicate.
//! 3. Optionally, pairs are folded into [`DirectoryPair`]s where two
//!    directories mirror each other file for file.
//!
//! Candidate selection and comparison run on rayon's global pool. Both
//! indexes are only read, and results are ordered by hash, so the outcome
//! does not depend on scheduling.
//!
//! # Example
//!
//! ```no_run
//! use duppur::duplicates::DuplicateEngine;
//! use duppur::index::Index;
//! use duppur::scanner::ExclusionSet;
//!
//! let index: Index = [("h", "/data/a/x.txt"), ("h", "/data/b/x.txt")]
//!     .into_iter()
//!     .collect();
//! let exclusions = ExclusionSet::empty();
//! let outcome = DuplicateEngine::new(&exclusions).find_duplicates(&index);
//! for pair in &outcome.files {
//!     println!("{} == {}", pair.kept, pair.redundant);
//! }
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;

use super::compare::contents_equal;
use crate::index::Index;
use crate::scanner::filter::ExclusionSet;
use crate::scanner::path_utils::{file_name_of, parent_of};

/// Label prefix for a redundant directory in a purge list.
pub const DIRECTORY_LABEL: &str = "(directory) ";

/// Label prefix for a redundant file in a purge list.
pub const FILE_LABEL: &str = "(file) ";

/// Two byte-identical files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DuplicatePair {
    /// The representative copy
    pub kept: String,
    /// The copy that can be purged
    pub redundant: String,
}

/// Two directories whose direct files mirror each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DirectoryPair {
    /// Directory holding the representatives
    pub kept: String,
    /// Directory that can be purged
    pub redundant: String,
}

/// Equal digests over unequal content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashCollision {
    /// The shared digest
    pub hash: String,
    /// The representative
    pub kept: String,
    /// The file that differs from it
    pub candidate: String,
}

/// Result of a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffOutcome {
    /// Consolidated directories, sorted
    pub directories: Vec<DirectoryPair>,
    /// File pairs not covered by a consolidated directory
    pub files: Vec<DuplicatePair>,
    /// Hash collisions met along the way
    pub collisions: Vec<HashCollision>,
}

impl DiffOutcome {
    /// True if nothing redundant was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty()
    }

    /// Labeled purge candidates: one per directory pair and file pair.
    #[must_use]
    pub fn purge_candidates(&self) -> BTreeSet<String> {
        let directories = self
            .directories
            .iter()
            .map(|d| format!("{DIRECTORY_LABEL}{}", d.redundant));
        let files = self
            .files
            .iter()
            .map(|f| format!("{FILE_LABEL}{}", f.redundant));
        directories.chain(files).collect()
    }
}

/// Per-group work item.
struct Comparison<'i> {
    hash: &'i str,
    kept: &'i str,
    candidates: Vec<&'i str>,
}

enum Verdict {
    Duplicate(DuplicatePair),
    Collision(HashCollision),
}

/// Finds verified duplicates between indexes.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateEngine<'a> {
    exclusions: &'a ExclusionSet,
    consolidate_directories: bool,
}

impl<'a> DuplicateEngine<'a> {
    /// Engine without directory consolidation.
    #[must_use]
    pub fn new(exclusions: &'a ExclusionSet) -> Self {
        Self {
            exclusions,
            consolidate_directories: false,
        }
    }

    /// Enable or disable directory consolidation.
    #[must_use]
    pub fn with_consolidation(mut self, enabled: bool) -> Self {
        self.consolidate_directories = enabled;
        self
    }

    /// Duplicates of `primary` entries found in `purgatory`.
    #[must_use]
    pub fn diff(&self, primary: &Index, purgatory: &Index) -> DiffOutcome {
        let groups: Vec<(&str, &[String])> = primary.iter().collect();
        let mut comparisons: Vec<Comparison<'_>> = groups
            .into_par_iter()
            .filter_map(|(hash, group)| self.plan(hash, group, purgatory))
            .collect();
        comparisons.sort_unstable_by(|a, b| a.hash.cmp(b.hash));
        log::debug!("{} hash groups to compare", comparisons.len());

        let verdicts: Vec<Verdict> = comparisons
            .par_iter()
            .flat_map_iter(|c| {
                c.candidates
                    .iter()
                    .filter_map(move |candidate| compare(c.hash, c.kept, candidate))
            })
            .collect();

        let mut outcome = DiffOutcome::default();
        let mut files = Vec::new();
        for verdict in verdicts {
            match verdict {
                Verdict::Duplicate(pair) => files.push(pair),
                Verdict::Collision(collision) => outcome.collisions.push(collision),
            }
        }

        if self.consolidate_directories {
            let (directories, remaining) = consolidate(files);
            outcome.directories = directories;
            outcome.files = remaining;
        } else {
            outcome.files = files;
        }

        log::debug!(
            "Diff finished: {} duplicate directories, {} duplicate files, {} collisions",
            outcome.directories.len(),
            outcome.files.len(),
            outcome.collisions.len()
        );
        outcome
    }

    /// Duplicates within a single index.
    #[must_use]
    pub fn find_duplicates(&self, index: &Index) -> DiffOutcome {
        self.diff(index, index)
    }

    /// Labeled purge candidates for `purgatory` against `primary`.
    #[must_use]
    pub fn purge_list(&self, primary: &Index, purgatory: &Index) -> BTreeSet<String> {
        self.diff(primary, purgatory).purge_candidates()
    }

    /// First path of the sorted group that no exclusion matches.
    #[must_use]
    pub fn representative<'g>(&self, group: &'g [String]) -> Option<&'g str> {
        let mut sorted: Vec<&str> = group.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        if self.exclusions.is_trivial() {
            return sorted.first().copied();
        }
        sorted
            .into_iter()
            .find(|path| !self.exclusions.is_excluded(path))
    }

    fn plan<'i>(
        &self,
        hash: &'i str,
        group: &'i [String],
        purgatory: &'i Index,
    ) -> Option<Comparison<'i>> {
        let others = purgatory.get(hash)?;
        let Some(kept) = self.representative(group) else {
            log::debug!("Every path of hash {} is excluded, skipping group", hash);
            return None;
        };

        let mut candidates: Vec<&str> = others
            .iter()
            .map(String::as_str)
            .filter(|candidate| *candidate != kept)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_unstable();
        Some(Comparison {
            hash,
            kept,
            candidates,
        })
    }
}

fn compare(hash: &str, kept: &str, candidate: &str) -> Option<Verdict> {
    match contents_equal(Path::new(kept), Path::new(candidate)) {
        Ok(true) => Some(Verdict::Duplicate(DuplicatePair {
            kept: kept.to_string(),
            redundant: candidate.to_string(),
        })),
        Ok(false) => {
            log::error!(
                "Hash collision on {}: contents differ\n\tfile A: {}\n\tfile B: {}",
                hash,
                kept,
                candidate
            );
            Some(Verdict::Collision(HashCollision {
                hash: hash.to_string(),
                kept: kept.to_string(),
                candidate: candidate.to_string(),
            }))
        }
        Err(e) => {
            log::error!("Cannot compare {} with {}: {}", kept, candidate, e);
            None
        }
    }
}

/// Fold file pairs into directory pairs.
///
/// Two distinct directories are consolidated when they hold the same set
/// of direct file names and every name is paired kept-to-redundant between
/// them. A redundant directory is consolidated at most once. File pairs
/// whose redundant path lies anywhere under a consolidated directory are
/// dropped, and so are directory pairs nested inside another one.
#[must_use]
pub fn consolidate(pairs: Vec<DuplicatePair>) -> (Vec<DirectoryPair>, Vec<DuplicatePair>) {
    let known: HashSet<(&str, &str)> = pairs
        .iter()
        .map(|p| (p.kept.as_str(), p.redundant.as_str()))
        .collect();
    let mut listings: HashMap<String, Option<BTreeSet<String>>> = HashMap::new();
    let mut consolidated: HashSet<String> = HashSet::new();
    let mut rejected: HashSet<(String, String)> = HashSet::new();
    let mut directories = Vec::new();

    for pair in &pairs {
        let (Some(kept_dir), Some(redundant_dir)) =
            (parent_of(&pair.kept), parent_of(&pair.redundant))
        else {
            continue;
        };
        if kept_dir == redundant_dir
            || file_name_of(&pair.kept) != file_name_of(&pair.redundant)
            || consolidated.contains(redundant_dir)
        {
            continue;
        }

        let key = (kept_dir.to_string(), redundant_dir.to_string());
        if rejected.contains(&key) {
            continue;
        }
        if directories_mirror(kept_dir, redundant_dir, &known, &mut listings) {
            log::debug!("{} mirrors {}", redundant_dir, kept_dir);
            consolidated.insert(key.1.clone());
            directories.push(DirectoryPair {
                kept: key.0,
                redundant: key.1,
            });
        } else {
            rejected.insert(key);
        }
    }

    directories.retain(|d| !has_consolidated_ancestor(&d.redundant, &consolidated));
    directories.sort_unstable();
    let remaining = pairs
        .into_iter()
        .filter(|p| !has_consolidated_ancestor(&p.redundant, &consolidated))
        .collect();
    (directories, remaining)
}

/// True if any proper ancestor directory of `path` is consolidated.
fn has_consolidated_ancestor(path: &str, consolidated: &HashSet<String>) -> bool {
    let mut current = path;
    while let Some(dir) = parent_of(current) {
        if dir == current {
            break;
        }
        if consolidated.contains(dir) {
            return true;
        }
        current = dir;
    }
    false
}

fn directories_mirror(
    kept_dir: &str,
    redundant_dir: &str,
    known: &HashSet<(&str, &str)>,
    listings: &mut HashMap<String, Option<BTreeSet<String>>>,
) -> bool {
    for dir in [kept_dir, redundant_dir] {
        if !listings.contains_key(dir) {
            listings.insert(dir.to_string(), direct_file_names(dir));
        }
    }
    let (Some(Some(kept_names)), Some(Some(redundant_names))) =
        (listings.get(kept_dir), listings.get(redundant_dir))
    else {
        return false;
    };
    if redundant_names.is_empty() || kept_names != redundant_names {
        return false;
    }
    redundant_names.iter().all(|name| {
        let kept = join(kept_dir, name);
        let redundant = join(redundant_dir, name);
        known.contains(&(kept.as_str(), redundant.as_str()))
    })
}

/// Names of the regular files directly inside `dir`.
fn direct_file_names(dir: &str) -> Option<BTreeSet<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Cannot list {}: {}", dir, e);
            return None;
        }
    };
    Some(
        entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect(),
    )
}

fn join(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}
