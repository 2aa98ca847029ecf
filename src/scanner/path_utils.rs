//! Path normalization utilities.
//!
//! Every path stored in an index, compared by the diff engine or matched
//! against an exclusion rule goes through [`normalize_path_str`] first:
//! backslashes become forward slashes and runs of slashes collapse to one.
//! Two paths are considered equal iff their normalized forms are equal.
//!
//! # Example
//!
//! ```
//! use duppur::scanner::path_utils::normalize_path_str;
//!
//! assert_eq!(normalize_path_str("C:\\data\\\\photos//a.jpg"), "C:/data/photos/a.jpg");
//! assert_eq!(normalize_path_str("/srv//backup///x.txt"), "/srv/backup/x.txt");
//! ```

use std::path::Path;

/// Normalize a path string: `\` → `/`, then collapse `//+` → `/`.
#[must_use]
pub fn normalize_path_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut previous_was_slash = false;

    for c in s.chars() {
        let c = if c == '\\' { '/' } else { c };
        if c == '/' {
            if previous_was_slash {
                continue;
            }
            previous_was_slash = true;
        } else {
            previous_was_slash = false;
        }
        out.push(c);
    }

    out
}

/// Normalize a [`Path`] into its canonical string form.
///
/// Non-UTF-8 components are replaced lossily; such paths cannot be written
/// to the line-oriented index format faithfully anyway.
#[must_use]
pub fn normalize_path(path: &Path) -> String {
    let lossy = path.to_string_lossy();
    if let std::borrow::Cow::Owned(_) = lossy {
        log::debug!("Path is not valid UTF-8, using lossy form: {}", lossy);
    }
    normalize_path_str(&lossy)
}

/// Check if two path strings are equal after normalization.
#[must_use]
pub fn paths_equal(a: &str, b: &str) -> bool {
    normalize_path_str(a) == normalize_path_str(b)
}

/// Directory part of a normalized path (everything before the last `/`).
///
/// Returns `None` when the path contains no separator.
#[must_use]
pub fn parent_of(normalized: &str) -> Option<&str> {
    normalized.rfind('/').map(|idx| {
        if idx == 0 {
            "/"
        } else {
            &normalized[..idx]
        }
    })
}

/// File name part of a normalized path (everything after the last `/`).
#[must_use]
pub fn file_name_of(normalized: &str) -> &str {
    match normalized.rfind('/') {
        Some(idx) => &normalized[idx + 1..],
        None => normalized,
    }
}
