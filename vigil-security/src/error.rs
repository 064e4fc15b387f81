//! Error types for the request-time CSP layer

use std::path::PathBuf;
use thiserror::Error;
use vigil_csp::CspError;

/// Result type for request-time CSP operations
pub type SecurityResult<T> = Result<T, SecurityError>;

/// Request-time CSP errors
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Policy construction error
    #[error(transparent)]
    Csp(#[from] CspError),

    /// A route or modifier names a policy that is not registered
    #[error("CSP misconfiguration: {0}")]
    Misconfiguration(String),

    /// A file to hash does not exist under the web root
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A path escapes the web root
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A rendered policy is not a valid header value
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    /// A violation report body could not be parsed
    #[error("Invalid CSP report: {0}")]
    InvalidReport(#[from] serde_json::Error),

    /// I/O error while hashing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SecurityError {
    /// Create a new misconfiguration error
    pub fn misconfiguration<S: Into<String>>(msg: S) -> Self {
        Self::Misconfiguration(msg.into())
    }

    /// Check if this error is a misconfiguration error
    pub fn is_misconfiguration(&self) -> bool {
        matches!(self, Self::Misconfiguration(_))
    }

    /// Check if this error is a missing file
    pub fn is_file_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound(_))
    }
}
