// Configuration validation

use crate::{ConfigError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static MIME_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*/[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*$")
        .expect("MIME type pattern is valid")
});

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Configuration validator with rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate that a value is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    /// Validate a source-list token: non-empty, no `;` or `,`
    pub fn source_token(value: &str, field: &str) -> Result<()> {
        Self::not_empty(value.trim(), field)?;
        if value.contains(';') || value.contains(',') {
            return Err(ConfigError::ValidationError(format!(
                "{} must not contain ';' or ',': {}",
                field, value
            )));
        }
        Ok(())
    }

    /// Validate a `type/subtype` MIME type
    pub fn mime_type(value: &str, field: &str) -> Result<()> {
        if !MIME_TYPE.is_match(value.trim()) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be a MIME type: {}",
                field, value
            )));
        }
        Ok(())
    }
}
