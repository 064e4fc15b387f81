// Declarative Content-Security-Policy configuration for Vigil

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::{DEFAULT_ENV_PREFIX, EnvLoader, EnvOverrides};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::{CspSettings, DirectiveSettings, PolicySettings};
pub use validation::{ConfigValidator, Validate};

use std::path::Path;
use vigil_csp::PolicyRegistry;

/// Load a settings file, apply `VIGIL_CSP_*` environment overrides and build the registry.
pub fn load_registry<P: AsRef<Path>>(path: P) -> Result<PolicyRegistry> {
    load_registry_with(path, &EnvLoader::default())
}

/// Like [`load_registry`], reading overrides through `env`.
pub fn load_registry_with<P: AsRef<Path>>(path: P, env: &EnvLoader) -> Result<PolicyRegistry> {
    let mut settings = CspSettings::from_file(path)?;
    EnvOverrides::load(env)?.apply(&mut settings);
    settings.into_registry()
}
