//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the duppur application.
///
/// - 0: Success
/// - 1: General error (usage error, unreadable input, unexpected failure)
/// - 2: Completed, but verification failures or hash collisions were found
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the run completed without integrity problems.
    Success = 0,
    /// General error: the run could not complete.
    GeneralError = 1,
    /// Integrity problems: changed files on verification or hash collisions.
    IntegrityFailure = 2,
    /// Interrupted: the run was interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DP000",
            Self::GeneralError => "DP001",
            Self::IntegrityFailure => "DP002",
            Self::Interrupted => "DP130",
        }
    }

    /// The more severe of two codes; interruption beats integrity failure.
    #[must_use]
    pub fn worst(self, other: Self) -> Self {
        fn rank(code: ExitCode) -> u8 {
            match code {
                ExitCode::Success => 0,
                ExitCode::IntegrityFailure => 1,
                ExitCode::Interrupted => 2,
                ExitCode::GeneralError => 3,
            }
        }
        if rank(other) > rank(self) {
            other
        } else {
            self
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DP001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
