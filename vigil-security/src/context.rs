//! Per-request CSP state.

use crate::error::{SecurityError, SecurityResult};
use crate::nonce::NonceProvider;
use crate::routes::RoutePlan;
use std::sync::{Arc, OnceLock};
use vigil_csp::{CspError, CspHeader, Directive, DirectiveName, NonceSource, Policy, RenderTarget, render};

/// Kind of inline element or subresource a nonce or hash is issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InlineKind {
    Script,
    Style,
}

impl InlineKind {
    /// Directive that governs this kind of element.
    pub fn directive_name(&self) -> DirectiveName {
        match self {
            InlineKind::Script => DirectiveName::ScriptSrc,
            InlineKind::Style => DirectiveName::StyleSrc,
        }
    }
}

/// CSP state owned by one request.
///
/// Holds request-local copies of the active policies, so handlers can add
/// nonces, hashes and plugin types without touching the registry. The first
/// active policy is the main policy.
pub struct RequestCsp {
    policies: Vec<(String, Policy)>,
    nonce: OnceLock<String>,
    nonce_provider: Arc<dyn NonceProvider>,
    plan: Arc<RoutePlan>,
    modifiers_applied: bool,
}

impl RequestCsp {
    pub(crate) fn new(
        policies: Vec<(String, Policy)>,
        nonce_provider: Arc<dyn NonceProvider>,
        plan: Arc<RoutePlan>,
    ) -> Self {
        Self {
            policies,
            nonce: OnceLock::new(),
            nonce_provider,
            plan,
            modifiers_applied: false,
        }
    }

    /// Nonce of this request, generated on first use.
    pub fn nonce(&self) -> &str {
        self.nonce.get_or_init(|| self.nonce_provider.create_nonce())
    }

    pub fn main_policy(&self) -> Option<&Policy> {
        self.policies.first().map(|(_, policy)| policy)
    }

    pub fn main_policy_mut(&mut self) -> Option<&mut Policy> {
        self.policies.first_mut().map(|(_, policy)| policy)
    }

    /// Active policies with their registered names, in activation order.
    pub fn policies(&self) -> impl Iterator<Item = (&str, &Policy)> {
        self.policies.iter().map(|(name, policy)| (name.as_str(), policy))
    }

    pub fn policy(&self, name: &str) -> Option<&Policy> {
        self.policies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, policy)| policy)
    }

    pub fn policy_mut(&mut self, name: &str) -> Option<&mut Policy> {
        self.policies
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, policy)| policy)
    }

    /// Route plan this request was started with.
    pub fn plan(&self) -> &RoutePlan {
        &self.plan
    }

    /// Turn on the nonce for `script-src` or `style-src` of the main policy.
    ///
    /// Returns the nonce to put on the element's `nonce` attribute.
    pub fn add_nonce(&mut self, kind: InlineKind) -> SecurityResult<String> {
        let nonce = self.nonce().to_string();
        self.main_policy_directive(kind)?.set_add_nonce(true);
        Ok(nonce)
    }

    /// Allow hashed content for `kind` in the main policy.
    ///
    /// Hashes are expected with their algorithm prefix, e.g. `sha256-...`, and
    /// are added quoted. Nothing is added if any hash is invalid, and an empty
    /// list leaves the directive untouched so `default-src` still applies.
    pub fn add_hashes<I, S>(&mut self, kind: InlineKind, hashes: I) -> SecurityResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let quoted: Vec<String> = hashes
            .into_iter()
            .map(|hash| format!("'{}'", hash.as_ref().trim()))
            .collect();
        if quoted.is_empty() {
            return Ok(());
        }
        if quoted.iter().any(|hash| hash.len() <= 2) {
            return Err(CspError::invalid_argument("hash", "hash cannot be empty").into());
        }
        Directive::default().append_all(&quoted)?;

        self.main_policy_directive(kind)?.append_all(&quoted)?;
        Ok(())
    }

    /// Add a MIME type to `plugin-types` of the main policy.
    pub fn allow_plugin_type(&mut self, mime_type: &str) -> SecurityResult<()> {
        let policy = self.main_policy_mut().ok_or_else(no_active_policy)?;
        policy
            .get_or_add_directive(DirectiveName::PluginTypes.as_str())?
            .append(mime_type)?;
        Ok(())
    }

    /// Render every active policy as a response header.
    pub fn headers(&self) -> Vec<CspHeader> {
        self.render_all(RenderTarget::Header)
    }

    /// Render every active policy as a `<meta http-equiv>` element.
    pub fn meta_tags(&self) -> Vec<String> {
        self.render_all(RenderTarget::MetaTag)
            .iter()
            .map(CspHeader::to_meta_tag)
            .collect()
    }

    pub(crate) fn modifiers_applied(&self) -> bool {
        self.modifiers_applied
    }

    /// Apply the route's append / override modifiers, at most once.
    pub(crate) fn apply_modifiers(&mut self) -> SecurityResult<()> {
        if self.modifiers_applied {
            return Ok(());
        }

        let plan = Arc::clone(&self.plan);
        for modifier in plan.modifiers() {
            if modifier.targets().is_empty() {
                let policy = self.main_policy_mut().ok_or_else(no_active_policy)?;
                policy.merge(modifier.policy(), modifier.mode());
                continue;
            }

            for target in modifier.targets() {
                let policy = self.policy_mut(target).ok_or_else(|| {
                    SecurityError::misconfiguration(format!(
                        "modifier targets policy `{}`, which is not active",
                        target
                    ))
                })?;
                policy.merge(modifier.policy(), modifier.mode());
            }
        }

        self.modifiers_applied = true;
        Ok(())
    }

    fn render_all(&self, target: RenderTarget) -> Vec<CspHeader> {
        self.policies
            .iter()
            .map(|(_, policy)| render(policy, self, target))
            .collect()
    }

    fn main_policy_directive(
        &mut self,
        kind: InlineKind,
    ) -> SecurityResult<&mut Directive> {
        let policy = self.main_policy_mut().ok_or_else(no_active_policy)?;
        Ok(policy.get_or_add_directive(kind.directive_name().as_str())?)
    }
}

impl NonceSource for RequestCsp {
    fn nonce(&self) -> String {
        RequestCsp::nonce(self).to_string()
    }
}

impl std::fmt::Debug for RequestCsp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCsp")
            .field("policies", &self.policies)
            .field("nonce", &self.nonce.get())
            .field("modifiers_applied", &self.modifiers_applied)
            .finish()
    }
}

fn no_active_policy() -> SecurityError {
    SecurityError::misconfiguration("no active CSP policy for this request")
}
