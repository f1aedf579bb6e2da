//! Error types for the encryption engine.
//!
//! Every fallible operation returns [`Result<T, CryptoError>`](CryptoError).
//! The variants are deliberately coarse at the security boundary: a wrong
//! password and a tampered container both surface as
//! [`AuthenticationFailed`](CryptoError::AuthenticationFailed), so callers
//! cannot be used as a password oracle.

use std::path::PathBuf;

use thiserror::Error;

/// The error type for all engine operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CryptoError {
    /// A caller-supplied argument is unusable (bad length, empty path,
    /// zero iterations, undersized buffer).
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// The input file does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The input or output file could not be opened due to permissions.
    #[error("access denied: {}", .0.display())]
    AccessDenied(PathBuf),

    /// The container is structurally malformed: bad magic, truncated
    /// header, or an impossible record length.
    #[error("malformed container: {0}")]
    Format(String),

    /// The container declares a format version this build does not read.
    #[error("unsupported container version: {0}")]
    UnsupportedVersion(u8),

    /// A chunk failed authentication. Wrong key/password and on-disk
    /// tampering are intentionally indistinguishable here.
    #[error("authentication failed: wrong password or corrupted data")]
    AuthenticationFailed,

    /// The OS cryptographic random generator could not be reached.
    /// Fatal; the engine never falls back to a weaker source.
    #[error("OS random generator unavailable")]
    RandomSourceUnavailable,

    /// Residual I/O failure not covered by the more specific variants.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable numeric codes exposed through the C ABI.
///
/// `0` is reserved for success; values must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    Ok = 0,
    InvalidParameter = 1,
    FileNotFound = 2,
    AccessDenied = 3,
    Format = 4,
    UnsupportedVersion = 5,
    AuthenticationFailed = 6,
    RandomSourceUnavailable = 7,
    Io = 8,
}

impl CryptoError {
    /// Maps the error onto its C ABI code.
    pub fn code(&self) -> ErrorCode {
        match self {
            CryptoError::InvalidParameter(_) => ErrorCode::InvalidParameter,
            CryptoError::FileNotFound(_) => ErrorCode::FileNotFound,
            CryptoError::AccessDenied(_) => ErrorCode::AccessDenied,
            CryptoError::Format(_) => ErrorCode::Format,
            CryptoError::UnsupportedVersion(_) => ErrorCode::UnsupportedVersion,
            CryptoError::AuthenticationFailed => ErrorCode::AuthenticationFailed,
            CryptoError::RandomSourceUnavailable => ErrorCode::RandomSourceUnavailable,
            CryptoError::Io(_) => ErrorCode::Io,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, CryptoError>;
