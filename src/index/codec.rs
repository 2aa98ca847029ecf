//! Line-oriented index format.
//!
//! One line per `(hash, path)` pair:
//!
//! ```text
//! <hash> *<normalized-absolute-path>
//! ```
//!
//! The separator is the two characters space and asterisk, which cannot
//! appear in a hex digest. A path that itself contains ` *` cannot be told
//! apart from the separator. Hash-first lines still split correctly on the
//! first occurrence, but [`SortMode::Path`] builds path-first lines and
//! re-splits them, which cuts such a path at its own ` *`. The format has
//! no escaping; this is a known limitation and is left as is.
//!
//! # Example
//!
//! ```
//! use duppur::index::{codec, Index, SortMode};
//!
//! let index: Index = [("ab12", "/data/x.txt")].into_iter().collect();
//! let mut out = Vec::new();
//! codec::write(&index, SortMode::Hash, &mut out).unwrap();
//! assert_eq!(out, b"ab12 */data/x.txt\n");
//!
//! let back = codec::read(out.as_slice()).unwrap();
//! assert_eq!(back.pair_set(), index.pair_set());
//! ```

use std::fmt;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use super::Index;
use crate::scanner::path_utils::normalize_path_str;

/// Field separator between hash and path.
pub const SEPARATOR: &str = " *";

/// Errors raised while reading or writing an index.
#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    /// A line has no separator.
    #[error("Malformed index line {line_no}: '{line}'")]
    Malformed {
        /// 1-based line number
        line_no: usize,
        /// The offending line
        line: String,
    },

    /// Sort mode outside `0..=2`.
    #[error("Invalid sort mode {0}, expected 0, 1 or 2")]
    InvalidSortMode(u8),

    /// Underlying read or write failure.
    #[error("Index I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Line ordering used when writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Map iteration order.
    None = 0,
    /// Whole lines sorted lexicographically, which groups by hash.
    #[default]
    Hash = 1,
    /// Lines ordered by path, still written hash first.
    Path = 2,
}

impl TryFrom<u8> for SortMode {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Hash),
            2 => Ok(Self::Path),
            other => Err(CodecError::InvalidSortMode(other)),
        }
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| format!("invalid sort mode '{s}', expected 0, 1 or 2"))?;
        Self::try_from(value).map_err(|e| e.to_string())
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// Render every pair of `index` as a line, ordered by `mode`.
#[must_use]
pub fn format_lines(index: &Index, mode: SortMode) -> Vec<String> {
    match mode {
        SortMode::None => index
            .pairs()
            .map(|(hash, path)| join(hash, path))
            .collect(),
        SortMode::Hash => {
            let mut lines: Vec<String> = index
                .pairs()
                .map(|(hash, path)| join(hash, path))
                .collect();
            lines.sort_unstable();
            lines
        }
        SortMode::Path => {
            let mut swapped: Vec<String> = index
                .pairs()
                .map(|(hash, path)| join(path, hash))
                .collect();
            swapped.sort_unstable();
            swapped
                .into_iter()
                .map(|line| match line.split_once(SEPARATOR) {
                    Some((path, hash)) => join(hash, path),
                    None => line,
                })
                .collect()
        }
    }
}

fn join(first: &str, second: &str) -> String {
    let mut line = String::with_capacity(first.len() + SEPARATOR.len() + second.len());
    line.push_str(first);
    line.push_str(SEPARATOR);
    line.push_str(second);
    line
}

/// Write `index` to an already created target, one line per pair.
///
/// Returns the number of lines written.
///
/// # Errors
///
/// [`CodecError::Io`] if the writer fails.
pub fn write<W: Write>(index: &Index, mode: SortMode, mut writer: W) -> Result<usize, CodecError> {
    let lines = format_lines(index, mode);
    for line in &lines {
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(lines.len())
}

/// Split a line on the first separator into `(hash, path)`.
///
/// Returns `None` when the line has no separator.
#[must_use]
pub fn parse_line(line: &str) -> Option<(&str, &str)> {
    line.split_once(SEPARATOR)
}

/// Read every `(hash, path)` pair, in file order.
///
/// Blank lines are skipped and a trailing carriage return is ignored.
/// Paths are normalized.
///
/// # Errors
///
/// [`CodecError::Malformed`] for the first line without a separator;
/// [`CodecError::Io`] if reading fails.
pub fn read_lines<R: BufRead>(reader: R) -> Result<Vec<(String, String)>, CodecError> {
    let mut pairs = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.strip_suffix('\r').unwrap_or(&line);
        if line.trim().is_empty() {
            continue;
        }
        let (hash, path) = parse_line(line).ok_or_else(|| CodecError::Malformed {
            line_no: idx + 1,
            line: line.to_string(),
        })?;
        pairs.push((hash.to_string(), normalize_path_str(path)));
    }
    Ok(pairs)
}

/// Read an index.
///
/// # Errors
///
/// As [`read_lines`].
pub fn read<R: BufRead>(reader: R) -> Result<Index, CodecError> {
    Ok(read_lines(reader)?.into_iter().collect())
}
