// Declarative policy settings

use crate::loader::{ConfigLoader, FileFormat};
use crate::validation::{ConfigValidator, Validate};
use crate::{ConfigError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use vigil_csp::{
    Directive, DirectiveBuilder, DirectiveName, HashAlgorithms, Policy, PolicyBuilder,
    PolicyRegistry, SandboxPermission, ScriptDirectiveBuilder, SourceListBuilder, Subresource,
};

/// Top-level CSP configuration.
///
/// ```toml
/// default_policy = "main"
///
/// [policies.main]
/// report_uri = "/csp-reports"
///
/// [policies.main.directives.default-src]
/// sources = ["self"]
///
/// [policies.main.directives.script-src]
/// sources = ["self", "https:", "strict-dynamic"]
/// nonce = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CspSettings {
    /// Policy used when a route names none. Falls back to the built-in policy.
    pub default_policy: Option<String>,

    /// Named policies, in file order.
    pub policies: IndexMap<String, PolicySettings>,
}

/// One named policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicySettings {
    pub report_only: Option<bool>,
    pub hash_algorithms: Option<Vec<String>>,
    pub sandbox: Option<Vec<SandboxPermission>>,
    pub require_sri_for: Option<Vec<Subresource>>,
    pub plugin_types: Vec<String>,
    pub report_uri: Option<String>,
    pub report_to: Option<String>,
    pub block_all_mixed_content: bool,
    pub upgrade_insecure_requests: bool,

    /// Source-list directives keyed by name, in file order.
    pub directives: IndexMap<String, DirectiveSettings>,
}

/// Sources of a single directive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectiveSettings {
    /// Keywords (`self`, `none`, ...), hashes (`sha256-...`), hosts or schemes.
    pub sources: Vec<String>,

    /// Render the request nonce with this directive.
    pub nonce: Option<bool>,

    /// Add `'report-sample'` (script-src only).
    pub report_sample: bool,
}

impl CspSettings {
    /// Load settings from a `.toml` or `.json` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let loader = ConfigLoader::auto(path.as_ref())?;
        let value = loader.load_file(path)?;
        Self::from_value(value)
    }

    /// Parse settings from a string in the given format.
    pub fn parse(content: &str, format: FileFormat) -> Result<Self> {
        let value = ConfigLoader::new(format).parse(content)?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    /// Validate and build the registry.
    ///
    /// The built-in policy is always present; configured policies are added
    /// in file order.
    pub fn into_registry(self) -> Result<PolicyRegistry> {
        self.validate()?;

        let mut registry = PolicyRegistry::new();
        for (name, settings) in &self.policies {
            let policy = settings.to_policy()?;
            registry.add_policy(name, policy)?;
        }

        if let Some(default_policy) = &self.default_policy {
            registry.set_default_policy_name(default_policy)?;
        }

        info!(
            policies = registry.len(),
            default_policy = %registry.default_policy_name(),
            "CSP policy registry configured"
        );
        Ok(registry)
    }
}

impl PolicySettings {
    /// Build the policy these settings describe.
    pub fn to_policy(&self) -> Result<Policy> {
        let mut builder = PolicyBuilder::new();

        for (name, directive) in &self.directives {
            let directive_name = parse_directive_name(name)?;
            builder = builder.add_directive(directive_name, directive.to_directive(directive_name)?);
        }

        if let Some(permissions) = &self.sandbox {
            builder = builder.add_sandbox(permissions);
        }
        if !self.plugin_types.is_empty() {
            builder = builder.add_plugin_types(&self.plugin_types)?;
        }
        if let Some(subresources) = &self.require_sri_for {
            builder = builder.require_subresource_integrity(subresources);
        }
        if self.block_all_mixed_content {
            builder = builder.block_all_mixed_content();
        }
        if self.upgrade_insecure_requests {
            builder = builder.upgrade_insecure_requests();
        }
        if let Some(uri) = &self.report_uri {
            builder = builder.report_uri(uri)?;
        }
        if let Some(group) = &self.report_to {
            builder = builder.report_to(group)?;
        }
        if let Some(algorithms) = &self.hash_algorithms {
            builder = builder.default_hash_algorithms(parse_hash_algorithms(algorithms)?);
        }

        let mut policy = builder.build();
        if let Some(report_only) = self.report_only {
            policy.set_report_only(report_only);
        }
        Ok(policy)
    }
}

impl DirectiveSettings {
    fn to_directive(&self, name: DirectiveName) -> Result<Directive> {
        if name == DirectiveName::ScriptSrc {
            let mut builder = apply_sources(ScriptDirectiveBuilder::new(), &self.sources)?;
            if self.report_sample {
                builder = builder.require_sample_in_report();
            }
            return Ok(self.apply_nonce(builder).build());
        }

        if self.report_sample {
            return Err(ConfigError::validation(format!(
                "report_sample is only supported on script-src, not {}",
                name
            )));
        }

        let builder = apply_sources(DirectiveBuilder::new(), &self.sources)?;
        Ok(self.apply_nonce(builder).build())
    }

    fn apply_nonce<B: SourceListBuilder>(&self, builder: B) -> B {
        match self.nonce {
            Some(true) => builder.add_nonce(),
            Some(false) => {
                let mut builder = builder;
                builder.directive_mut().set_add_nonce(false);
                builder
            }
            None => builder,
        }
    }
}

const HASH_PREFIXES: [&str; 3] = ["sha256-", "sha384-", "sha512-"];

fn apply_sources<B: SourceListBuilder>(mut builder: B, sources: &[String]) -> Result<B> {
    for source in sources {
        let bare = source.trim().trim_matches('\'');
        builder = match bare.to_ascii_lowercase().as_str() {
            "self" => builder.allow_self(),
            "none" => builder.allow_none(),
            "unsafe-inline" => builder.allow_unsafe_inline(),
            "unsafe-eval" => builder.allow_eval(),
            "strict-dynamic" => builder.use_strict_dynamic(),
            "report-sample" => builder.allow_source("'report-sample'")?,
            lower if HASH_PREFIXES.iter().any(|p| lower.starts_with(p)) => {
                builder.allow_hash(bare)?
            }
            _ => builder.allow_source(source.trim())?,
        };
    }
    Ok(builder)
}

pub(crate) fn parse_directive_name(name: &str) -> Result<DirectiveName> {
    name.parse::<DirectiveName>()
        .map_err(|_| ConfigError::validation(format!("Unknown directive: {}", name)))
}

pub(crate) fn parse_hash_algorithms(names: &[String]) -> Result<HashAlgorithms> {
    let algorithms = HashAlgorithms::from_names(names)
        .map_err(|name| ConfigError::validation(format!("Unknown hash algorithm: {}", name)))?;
    if algorithms.is_empty() {
        return Err(ConfigError::validation("hash_algorithms cannot be empty"));
    }
    Ok(algorithms)
}

impl Validate for CspSettings {
    fn validate(&self) -> Result<()> {
        for (name, policy) in &self.policies {
            ConfigValidator::not_empty(name.trim(), "policy name")?;
            policy
                .validate()
                .map_err(|e| ConfigError::validation(format!("policy `{}`: {}", name, e)))?;
        }

        if let Some(default_policy) = &self.default_policy {
            ConfigValidator::not_empty(default_policy.trim(), "default_policy")?;
            if !self.policies.contains_key(default_policy.as_str())
                && default_policy != vigil_csp::BUILT_IN_POLICY_NAME
            {
                return Err(ConfigError::validation(format!(
                    "default_policy `{}` is not defined",
                    default_policy
                )));
            }
        }

        debug!(policies = self.policies.len(), "CSP settings validated");
        Ok(())
    }
}

impl Validate for PolicySettings {
    fn validate(&self) -> Result<()> {
        for (name, directive) in &self.directives {
            let directive_name = parse_directive_name(name)?;
            if directive.report_sample && directive_name != DirectiveName::ScriptSrc {
                return Err(ConfigError::validation(format!(
                    "report_sample is only supported on script-src, not {}",
                    name
                )));
            }
            for source in &directive.sources {
                ConfigValidator::source_token(source, name)?;
            }
        }

        if let Some(algorithms) = &self.hash_algorithms {
            parse_hash_algorithms(algorithms)?;
        }
        for mime in &self.plugin_types {
            ConfigValidator::mime_type(mime, "plugin_types")?;
        }
        if let Some(uri) = &self.report_uri {
            ConfigValidator::source_token(uri, "report_uri")?;
        }
        if let Some(group) = &self.report_to {
            ConfigValidator::source_token(group, "report_to")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        default_policy = "main"

        [policies.main]
        hash_algorithms = ["sha256", "sha512"]
        report_uri = "/csp-reports"
        upgrade_insecure_requests = true

        [policies.main.directives.default-src]
        sources = ["self"]

        [policies.main.directives.script-src]
        sources = ["'self'", "https:", "sha256-abc=", "strict-dynamic"]
        nonce = true
        report_sample = true

        [policies.reporting]
        report_only = true
        sandbox = ["allow-scripts", "allow-forms"]

        [policies.reporting.directives.img-src]
        sources = ["none", "data:"]
    "#;

    #[test]
    fn test_parse_sample() {
        let settings = CspSettings::parse(SAMPLE, FileFormat::Toml).unwrap();
        assert_eq!(settings.default_policy.as_deref(), Some("main"));
        assert_eq!(settings.policies.len(), 2);

        let main = &settings.policies["main"];
        assert_eq!(main.directives["script-src"].nonce, Some(true));
        assert!(main.upgrade_insecure_requests);
        assert_eq!(main.report_only, None);
    }

    #[test]
    fn test_policy_from_settings() {
        let settings = CspSettings::parse(SAMPLE, FileFormat::Toml).unwrap();
        let policy = settings.policies["main"].to_policy().unwrap();

        assert_eq!(
            policy.to_header("n").value,
            "default-src 'self'; script-src 'self' https: 'sha256-abc=' 'strict-dynamic' \
             'report-sample' 'nonce-n'; upgrade-insecure-requests; report-uri /csp-reports"
        );
        assert_eq!(
            policy.default_hash_algorithms(),
            HashAlgorithms::SHA256 | HashAlgorithms::SHA512
        );
        assert_eq!(policy.report_only_setting(), None);
    }

    #[test]
    fn test_none_is_cancelled_by_later_sources() {
        let settings = CspSettings::parse(SAMPLE, FileFormat::Toml).unwrap();
        let policy = settings.policies["reporting"].to_policy().unwrap();

        assert!(policy.report_only());
        assert_eq!(policy.directive("img-src").unwrap().value(), "data:");
        assert_eq!(
            policy.directive("sandbox").unwrap().value(),
            "allow-scripts allow-forms"
        );
    }

    #[test]
    fn test_into_registry() {
        let registry = CspSettings::parse(SAMPLE, FileFormat::Toml)
            .unwrap()
            .into_registry()
            .unwrap();

        assert_eq!(registry.default_policy_name(), "main");
        assert!(registry.get_policy("reporting").is_some());
        assert!(registry.get_policy(vigil_csp::BUILT_IN_POLICY_NAME).is_some());
    }

    #[test]
    fn test_empty_settings_use_built_in_default() {
        let registry = CspSettings::default().into_registry().unwrap();
        assert_eq!(registry.default_policy_name(), vigil_csp::BUILT_IN_POLICY_NAME);
        assert!(registry.default_policy().is_some());
    }

    #[test]
    fn test_unknown_directive_rejected() {
        let toml = r#"
            [policies.main.directives.child-src]
            sources = ["self"]
        "#;
        let err = CspSettings::parse(toml, FileFormat::Toml)
            .unwrap()
            .into_registry()
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("child-src"));
    }

    #[test]
    fn test_undefined_default_policy_rejected() {
        let toml = r#"
            default_policy = "missing"

            [policies.main.directives.default-src]
            sources = ["self"]
        "#;
        let err = CspSettings::parse(toml, FileFormat::Toml)
            .unwrap()
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_unknown_hash_algorithm_rejected() {
        let toml = r#"
            [policies.main]
            hash_algorithms = ["md5"]
        "#;
        let settings = CspSettings::parse(toml, FileFormat::Toml).unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_report_sample_only_on_script_src() {
        let toml = r#"
            [policies.main.directives.style-src]
            sources = ["self"]
            report_sample = true
        "#;
        let settings = CspSettings::parse(toml, FileFormat::Toml).unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
            [policies.main]
            report_onyl = true
        "#;
        let err = CspSettings::parse(toml, FileFormat::Toml).unwrap_err();
        assert!(matches!(err, ConfigError::DeserializationError(_)));
    }

    #[test]
    fn test_json_settings() {
        let json = r#"{
            "policies": {
                "api": {
                    "directives": {
                        "default-src": { "sources": ["none"] },
                        "frame-ancestors": { "sources": ["none"] }
                    }
                }
            }
        }"#;
        let settings = CspSettings::parse(json, FileFormat::Json).unwrap();
        let policy = settings.policies["api"].to_policy().unwrap();
        assert_eq!(
            policy.to_header("").value,
            "default-src 'none'; frame-ancestors 'none'"
        );
    }
}
