//! Named policy store with a configurable default.

use crate::directive::Directive;
use crate::directive_builder::{DirectiveBuilder, SourceListBuilder};
use crate::error::{CspError, CspResult};
use crate::names::{DirectiveName, schemes};
use crate::policy::Policy;
use crate::policy_builder::PolicyBuilder;
use indexmap::IndexMap;
use tracing::debug;

/// Name under which the built-in policy is registered.
pub const BUILT_IN_POLICY_NAME: &str = "__DefaultContentSecurityPolicy";

/// Registered policies, populated at startup and read-only afterwards.
///
/// A fresh registry holds the built-in policy, which is also the default.
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    policies: IndexMap<String, Policy>,
    default_policy_name: String,
}

impl PolicyRegistry {
    /// Create a registry holding only the built-in policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with no policies at all.
    pub fn empty() -> Self {
        Self {
            policies: IndexMap::new(),
            default_policy_name: BUILT_IN_POLICY_NAME.to_string(),
        }
    }

    /// Register or replace a policy.
    pub fn add_policy(&mut self, name: &str, policy: Policy) -> CspResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CspError::invalid_argument("name", "policy name cannot be empty"));
        }

        debug!(policy = %name, directives = policy.len(), "Registered policy");
        self.policies.insert(name.to_string(), policy);
        Ok(())
    }

    /// Register or replace the policy under the current default name.
    pub fn add_default_policy(&mut self, policy: Policy) {
        debug!(policy = %self.default_policy_name, "Registered default policy");
        self.policies.insert(self.default_policy_name.clone(), policy);
    }

    pub fn get_policy(&self, name: &str) -> Option<&Policy> {
        self.policies.get(name)
    }

    /// Mutable access for configuration-time edits.
    pub fn get_policy_mut(&mut self, name: &str) -> Option<&mut Policy> {
        self.policies.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.policies.contains_key(name)
    }

    pub fn default_policy_name(&self) -> &str {
        &self.default_policy_name
    }

    /// Change which policy is used when none is named.
    pub fn set_default_policy_name(&mut self, name: &str) -> CspResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CspError::invalid_argument(
                "default_policy_name",
                "default policy name cannot be empty",
            ));
        }

        debug!(policy = %name, "Default policy name changed");
        self.default_policy_name = name.to_string();
        Ok(())
    }

    /// The policy registered under the default name, if any.
    pub fn default_policy(&self) -> Option<&Policy> {
        self.policies.get(&self.default_policy_name)
    }

    /// Look up `name`, or the default policy when `None`.
    pub fn resolve(&self, name: Option<&str>) -> Option<&Policy> {
        match name {
            Some(name) => self.get_policy(name),
            None => self.default_policy(),
        }
    }

    /// Registered policy names in registration order.
    pub fn policy_names(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        let mut policies = IndexMap::new();
        policies.insert(BUILT_IN_POLICY_NAME.to_string(), built_in_policy());
        Self {
            policies,
            default_policy_name: BUILT_IN_POLICY_NAME.to_string(),
        }
    }
}

/// The secure baseline policy:
///
/// `default-src 'self' https:; font-src 'self' https: data:; img-src 'self' https: data:;
/// object-src 'none'; script-src 'self' https:; style-src 'self' https: 'unsafe-inline'`
pub fn built_in_policy() -> Policy {
    PolicyBuilder::new()
        .add_directive(DirectiveName::DefaultSrc, sources(&[SELF, schemes::HTTPS]))
        .add_directive(
            DirectiveName::FontSrc,
            sources(&[SELF, schemes::HTTPS, schemes::DATA]),
        )
        .add_directive(
            DirectiveName::ImgSrc,
            sources(&[SELF, schemes::HTTPS, schemes::DATA]),
        )
        .add_object_src(DirectiveBuilder::new().allow_none())
        .add_directive(DirectiveName::ScriptSrc, sources(&[SELF, schemes::HTTPS]))
        .add_directive(
            DirectiveName::StyleSrc,
            sources(&[SELF, schemes::HTTPS, "'unsafe-inline'"]),
        )
        .build()
}

const SELF: &str = "'self'";

fn sources(tokens: &[&str]) -> Directive {
    let mut directive = Directive::default();
    for token in tokens {
        directive.push_token(token);
    }
    directive
}
