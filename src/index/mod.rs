//! The content index: content hash to the paths sharing it.
//!
//! An [`Index`] is built by [`indexer::ContentIndexer`] or read back by
//! [`codec::read`], then consumed by the duplicate engine or written out
//! with [`codec::write`].
//!
//! Every group in an index is non-empty and holds each normalized path at
//! most once. The order of paths inside a group is not meaningful: parallel
//! hashing inserts them in completion order.

pub mod codec;
pub mod indexer;

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::scanner::path_utils::normalize_path_str;

pub use codec::{CodecError, SortMode, SEPARATOR};
pub use indexer::{ContentIndexer, IndexError, IndexerConfig, Pruned, Verification};

/// Mapping from content hash to the normalized paths sharing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    groups: HashMap<String, Group>,
}

/// Paths of one hash in insertion order, with a membership set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Group {
    paths: Vec<String>,
    members: HashSet<String>,
}

impl Index {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `path` to the group of `hash`.
    ///
    /// The path is normalized first. Returns `false` if the group already
    /// held it.
    pub fn insert(&mut self, hash: impl Into<String>, path: &str) -> bool {
        let path = normalize_path_str(path);
        let group = self.groups.entry(hash.into()).or_default();
        if !group.members.insert(path.clone()) {
            return false;
        }
        group.paths.push(path);
        true
    }

    /// Paths stored under `hash`.
    #[must_use]
    pub fn get(&self, hash: &str) -> Option<&[String]> {
        self.groups.get(hash).map(|g| g.paths.as_slice())
    }

    /// Iterate over `(hash, paths)` groups in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups
            .iter()
            .map(|(hash, group)| (hash.as_str(), group.paths.as_slice()))
    }

    /// Iterate over every `(hash, path)` pair.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter()
            .flat_map(|(hash, paths)| paths.iter().map(move |p| (hash, p.as_str())))
    }

    /// The index as an ordered set of `(hash, path)` pairs.
    ///
    /// Two indexes holding the same pairs compare equal through this view
    /// regardless of insertion order.
    #[must_use]
    pub fn pair_set(&self) -> BTreeSet<(String, String)> {
        self.pairs()
            .map(|(hash, path)| (hash.to_string(), path.to_string()))
            .collect()
    }

    /// Number of distinct hashes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// True when the index holds no paths.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of paths across all groups.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.groups.values().map(|g| g.paths.len()).sum()
    }

    /// Keep only the pairs for which `keep` returns true.
    ///
    /// Groups left empty are removed. Returns the number of paths dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) -> usize {
        let mut removed = 0;
        self.groups.retain(|hash, group| {
            let Group { paths, members } = group;
            let before = paths.len();
            paths.retain(|path| {
                let kept = keep(hash, path);
                if !kept {
                    members.remove(path);
                }
                kept
            });
            removed += before - paths.len();
            !paths.is_empty()
        });
        removed
    }
}

impl<H: Into<String>, P: AsRef<str>> FromIterator<(H, P)> for Index {
    fn from_iter<I: IntoIterator<Item = (H, P)>>(iter: I) -> Self {
        let mut index = Self::new();
        for (hash, path) in iter {
            index.insert(hash, path.as_ref());
        }
        index
    }
}
