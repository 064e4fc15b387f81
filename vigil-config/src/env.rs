// Environment variable overrides

use crate::settings::CspSettings;
use crate::{ConfigError, Result};
use std::env;
use std::path::Path;
use tracing::{debug, info};

/// Default prefix for CSP environment variables.
pub const DEFAULT_ENV_PREFIX: &str = "VIGIL_CSP";

/// Environment variable loader
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.full_key(key)).map_err(ConfigError::EnvError)
    }

    /// Load a variable, treating absence as `None`
    pub fn load_optional(&self, key: &str) -> Result<Option<String>> {
        match self.load_var(key) {
            Ok(value) => Ok(Some(value)),
            Err(ConfigError::EnvError(env::VarError::NotPresent)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Load variables from a `.env` file into the process environment
    pub fn load_dotenv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        dotenvy::from_path(path.as_ref()).map_err(|e| ConfigError::LoadError(e.to_string()))?;
        debug!(path = %path.as_ref().display(), "Loaded .env file");
        Ok(())
    }

    fn full_key(&self, key: &str) -> String {
        match self.prefix {
            Some(ref prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(Some(DEFAULT_ENV_PREFIX.to_string()))
    }
}

/// Deployment-time overrides read from `{PREFIX}_DEFAULT_POLICY` and `{PREFIX}_REPORT_ONLY`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// Replaces `default_policy`
    pub default_policy: Option<String>,
    /// Forces every configured policy into (or out of) report-only mode
    pub report_only: Option<bool>,
}

impl EnvOverrides {
    /// Read overrides using the default `VIGIL_CSP` prefix.
    pub fn from_env() -> Result<Self> {
        Self::load(&EnvLoader::default())
    }

    /// Read overrides through the given loader.
    pub fn load(loader: &EnvLoader) -> Result<Self> {
        let default_policy = loader
            .load_optional("DEFAULT_POLICY")?
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let report_only = loader
            .load_optional("REPORT_ONLY")?
            .map(|value| parse_bool(&value))
            .transpose()?;

        Ok(Self {
            default_policy,
            report_only,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.default_policy.is_none() && self.report_only.is_none()
    }

    /// Apply the overrides to loaded settings.
    pub fn apply(&self, settings: &mut CspSettings) {
        if let Some(default_policy) = &self.default_policy {
            info!(default_policy = %default_policy, "Default CSP policy overridden from environment");
            settings.default_policy = Some(default_policy.clone());
        }

        if let Some(report_only) = self.report_only {
            info!(report_only, "CSP report-only mode overridden from environment");
            for policy in settings.policies.values_mut() {
                policy.report_only = Some(report_only);
            }
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::ParseError(format!(
            "expected a boolean, got `{}`",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PolicySettings;

    // std::env::set_var is unsafe and process-wide; these tests only read
    // variables that are never set. See tests/integration_test.rs for the rest.

    #[test]
    fn test_missing_var_is_none() {
        let loader = EnvLoader::new(Some("VIGIL_CSP_UNIT".to_string()));
        assert!(loader.load_var("MISSING_VAR_67890").is_err());
        assert_eq!(loader.load_optional("MISSING_VAR_67890").unwrap(), None);
    }

    #[test]
    fn test_no_overrides_without_variables() {
        let loader = EnvLoader::new(Some("VIGIL_CSP_UNIT_EMPTY".to_string()));
        let overrides = EnvOverrides::load(&loader).unwrap();
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("1").unwrap());
        assert!(parse_bool("TRUE").unwrap());
        assert!(!parse_bool("off").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut settings = CspSettings::default();
        settings
            .policies
            .insert("main".to_string(), PolicySettings::default());
        settings.policies.insert(
            "legacy".to_string(),
            PolicySettings {
                report_only: Some(false),
                ..Default::default()
            },
        );

        let overrides = EnvOverrides {
            default_policy: Some("legacy".to_string()),
            report_only: Some(true),
        };
        overrides.apply(&mut settings);

        assert_eq!(settings.default_policy.as_deref(), Some("legacy"));
        assert!(settings.policies.values().all(|p| p.report_only == Some(true)));
    }
}
