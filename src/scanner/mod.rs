//! Scanner module for directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - Eligibility checks and regex exclusion rules
//! - Recursive listing of eligible files
//! - Streaming content hashing with a selectable digest
//! - Path normalization
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`filter`]: Per-entry predicates and [`ExclusionSet`]
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: Hash-function registry and streaming hashing
//! - [`path_utils`]: Normalized path strings
//!
//! # Example
//!
//! ```no_run
//! use duppur::progress::ProgressMonitor;
//! use duppur::scanner::{Crawler, ExclusionSet, HashAlgorithm};
//! use std::path::Path;
//!
//! let exclusions = ExclusionSet::empty();
//! let monitor = ProgressMonitor::silent();
//! let files = Crawler::new(&exclusions, &monitor)
//!     .list(Path::new("/srv/data"))
//!     .unwrap();
//!
//! for file in &files {
//!     match HashAlgorithm::Sha256.hash_file(Path::new(file)) {
//!         Ok(hash) => println!("{hash} *{file}"),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod filter;
pub mod hasher;
pub mod path_utils;
pub mod walker;

// Re-export main types
pub use filter::{ExclusionSet, FilePredicate, FilterError, NOOP_PATTERN};
pub use hasher::{HashAlgorithm, HashError};
pub use path_utils::{normalize_path, normalize_path_str};
pub use walker::{CrawlError, Crawler};
