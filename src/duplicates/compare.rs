//! Byte-for-byte file comparison.
//!
//! Equal digests are only a candidate signal. [`contents_equal`] is the
//! proof the duplicate engine relies on before it reports a pair.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Read chunk size for comparison.
const CHUNK_SIZE: usize = 64 * 1024;

/// True if both files have exactly the same bytes.
///
/// Files of different length are unequal without reading them.
///
/// # Errors
///
/// Propagates any error opening, inspecting or reading either file.
pub fn contents_equal(a: &Path, b: &Path) -> io::Result<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }

    let mut left = BufReader::with_capacity(CHUNK_SIZE, File::open(a)?);
    let mut right = BufReader::with_capacity(CHUNK_SIZE, File::open(b)?);
    let mut left_buf = vec![0u8; CHUNK_SIZE];
    let mut right_buf = vec![0u8; CHUNK_SIZE];

    loop {
        let left_len = fill(&mut left, &mut left_buf)?;
        let right_len = fill(&mut right, &mut right_buf)?;
        if left_len != right_len || left_buf[..left_len] != right_buf[..right_len] {
            return Ok(false);
        }
        if left_len == 0 {
            return Ok(true);
        }
    }
}

/// Read until `buf` is full or the reader is exhausted.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
