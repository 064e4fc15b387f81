//! Error types for policy construction and resolution

use thiserror::Error;

/// Result type for policy operations
pub type CspResult<T> = Result<T, CspError>;

/// Content security policy errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CspError {
    /// A required argument was empty or contained a forbidden character
    #[error("Invalid argument `{argument}`: {message}")]
    InvalidArgument {
        /// Name of the offending argument
        argument: &'static str,
        /// What was wrong with it
        message: String,
    },
}

impl CspError {
    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(argument: &'static str, message: S) -> Self {
        Self::InvalidArgument {
            argument,
            message: message.into(),
        }
    }

    /// Check if this error is an invalid argument error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}

/// Reject empty values and values that would break the header grammar.
pub(crate) fn validate_token(argument: &'static str, value: &str) -> CspResult<()> {
    if value.trim().is_empty() {
        return Err(CspError::invalid_argument(argument, "value cannot be empty"));
    }

    if value.contains(';') || value.contains(',') {
        return Err(CspError::invalid_argument(
            argument,
            format!("`{}` must not contain ';' or ','", value),
        ));
    }

    Ok(())
}
