//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Representative selection per hash group
//! - Byte-for-byte verification of hash matches
//! - Hash collision detection
//! - Duplicate directory consolidation
//! - Purge candidate lists

pub mod compare;
pub mod engine;

pub use compare::contents_equal;
pub use engine::{
    consolidate, DiffOutcome, DirectoryPair, DuplicateEngine, DuplicatePair, HashCollision,
    DIRECTORY_LABEL, FILE_LABEL,
};
