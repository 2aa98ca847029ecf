//! Streaming content hashing.
//!
//! # Overview
//!
//! [`HashAlgorithm`] is the closed registry of supported digests. A name
//! given on the command line or in the configuration file is resolved once,
//! up front, through [`HashAlgorithm::from_name`]; an unknown name yields
//! [`HashError::Unsupported`] instead of failing halfway through a run.
//!
//! Names are matched case-insensitively and ignore `-` and `_`, so
//! `SHA-512`, `sha512` and `Sha_512` are the same algorithm.
//!
//! Files are streamed through the digest in fixed-size chunks; the file
//! handle is closed when the reader is dropped, including on read errors.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use md5::Md5;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

/// Read buffer size for streaming digests.
const BUFFER_SIZE: usize = 64 * 1024;

/// Errors that can occur during hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The requested algorithm is not in the registry.
    #[error("Unsupported hash function: {0}")]
    Unsupported(String),

    /// The file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl HashError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Supported content digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    /// MD5 (128 bit). Fast, not collision resistant.
    Md5,
    /// SHA-224
    Sha224,
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512, the default.
    #[default]
    Sha512,
    /// BLAKE3 (256 bit)
    Blake3,
}

impl HashAlgorithm {
    /// Every registered algorithm.
    pub const ALL: [HashAlgorithm; 6] = [
        Self::Md5,
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
        Self::Blake3,
    ];

    /// Resolve a user-supplied name.
    ///
    /// # Errors
    ///
    /// [`HashError::Unsupported`] if the name matches no registered algorithm.
    pub fn from_name(name: &str) -> Result<Self, HashError> {
        let key: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        match key.as_str() {
            "md5" => Ok(Self::Md5),
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            "blake3" => Ok(Self::Blake3),
            _ => Err(HashError::Unsupported(name.to_string())),
        }
    }

    /// Canonical display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha224 => "SHA-224",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
            Self::Blake3 => "BLAKE3",
        }
    }

    /// Length of the hex digest this algorithm produces.
    #[must_use]
    pub fn hex_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha224 => 56,
            Self::Sha256 | Self::Blake3 => 64,
            Self::Sha384 => 96,
            Self::Sha512 => 128,
        }
    }

    /// Stream `reader` to the end and return the lowercase hex digest.
    ///
    /// # Errors
    ///
    /// Propagates read errors from `reader`.
    pub fn hash_reader<R: Read>(self, reader: R) -> io::Result<String> {
        match self {
            Self::Md5 => digest_reader::<Md5, _>(reader),
            Self::Sha224 => digest_reader::<Sha224, _>(reader),
            Self::Sha256 => digest_reader::<Sha256, _>(reader),
            Self::Sha384 => digest_reader::<Sha384, _>(reader),
            Self::Sha512 => digest_reader::<Sha512, _>(reader),
            Self::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                stream(reader, |chunk| {
                    hasher.update(chunk);
                })?;
                Ok(hasher.finalize().to_hex().to_string())
            }
        }
    }

    /// Open `path` and hash its full content.
    ///
    /// # Errors
    ///
    /// [`HashError::NotFound`], [`HashError::PermissionDenied`] or
    /// [`HashError::Io`] if the file cannot be opened or read.
    pub fn hash_file(self, path: &Path) -> Result<String, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        self.hash_reader(BufReader::with_capacity(BUFFER_SIZE, file))
            .map_err(|e| HashError::from_io(path, e))
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

fn digest_reader<D: Digest, R: Read>(reader: R) -> io::Result<String> {
    let mut hasher = D::new();
    stream(reader, |chunk| hasher.update(chunk))?;
    Ok(to_hex(&hasher.finalize()))
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn stream<R: Read>(mut reader: R, mut sink: impl FnMut(&[u8])) -> io::Result<()> {
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        sink(&buffer[..read]);
    }
}
