//! CSP middleware for `http` based servers
//!
//! The middleware is split in two halves so it fits any server stack:
//! [`CspMiddleware::begin`] runs when a request arrives and returns the
//! request-scoped [`RequestCsp`], [`CspMiddleware::finish`] runs when the
//! response headers are written.

use crate::context::RequestCsp;
use crate::error::{SecurityError, SecurityResult};
use crate::nonce::{NonceProvider, RandomNonceProvider};
use crate::provider::PolicyProvider;
use crate::routes::RouteTable;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::request::Parts;
use http::Response;
use std::sync::Arc;
use tracing::{info, trace, warn};
use vigil_csp::CONTENT_SECURITY_POLICY_REPORT_ONLY;

/// Content-Security-Policy middleware
pub struct CspMiddleware {
    /// Source of registered policies
    provider: Arc<dyn PolicyProvider>,
    /// Per-route enable / disable / modify plans
    routes: Arc<RouteTable>,
    /// Nonce generator
    nonce_provider: Arc<dyn NonceProvider>,
}

impl CspMiddleware {
    /// Create middleware that applies the provider's default policy to every route
    pub fn new(provider: impl PolicyProvider + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
            routes: Arc::new(RouteTable::enable_default()),
            nonce_provider: Arc::new(RandomNonceProvider::new()),
        }
    }

    /// Use a custom route table
    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = Arc::new(routes);
        self
    }

    /// Use a custom nonce generator
    pub fn with_nonce_provider(mut self, nonce_provider: impl NonceProvider + 'static) -> Self {
        self.nonce_provider = Arc::new(nonce_provider);
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Start CSP handling for a request.
    ///
    /// Returns `None` when CSP is disabled or not enabled for `route`.
    /// Otherwise the active policies are copied into a new [`RequestCsp`].
    pub fn begin(&self, route: Option<&str>, request: &Parts) -> SecurityResult<Option<RequestCsp>> {
        let Some(plan) = self.routes.plan(route) else {
            trace!(route = ?route, "CSP not enabled for route");
            return Ok(None);
        };

        let names: Vec<String> = if plan.policies().is_empty() {
            vec![self.provider.default_policy_name().to_string()]
        } else {
            plan.policies().to_vec()
        };

        let mut policies = Vec::with_capacity(names.len());
        for name in names {
            let policy = self
                .provider
                .get_policy(request, Some(name.as_str()))
                .ok_or_else(|| {
                    SecurityError::misconfiguration(format!(
                        "policy `{}` is enabled but not registered",
                        name
                    ))
                })?
                .into_owned();
            policies.push((name, policy));
        }

        trace!(route = ?route, policies = policies.len(), "Activated CSP policies");

        Ok(Some(RequestCsp::new(
            policies,
            Arc::clone(&self.nonce_provider),
            Arc::clone(plan),
        )))
    }

    /// Apply route modifiers and write one header per active policy.
    ///
    /// Headers are appended, so existing CSP headers are kept.
    pub fn finish(&self, csp: &mut RequestCsp, headers: &mut HeaderMap) -> SecurityResult<()> {
        csp.apply_modifiers()?;

        let rendered = csp.headers();
        let mut values: Vec<(HeaderName, HeaderValue)> = Vec::with_capacity(rendered.len());
        for csp_header in &rendered {
            let name = if csp_header.name == CONTENT_SECURITY_POLICY_REPORT_ONLY {
                header::CONTENT_SECURITY_POLICY_REPORT_ONLY
            } else {
                header::CONTENT_SECURITY_POLICY
            };
            let value = HeaderValue::from_str(&csp_header.value).map_err(|e| {
                warn!(header = csp_header.name, error = %e, "Rejected CSP header value");
                SecurityError::InvalidHeader(format!("{}: {}", csp_header.name, e))
            })?;
            values.push((name, value));
        }

        for (name, value) in values {
            headers.append(name, value);
        }

        info!(
            policies = rendered.len(),
            report_only = rendered
                .iter()
                .filter(|h| h.name == CONTENT_SECURITY_POLICY_REPORT_ONLY)
                .count(),
            "Content security policy applied"
        );
        Ok(())
    }

    /// [`finish`](Self::finish) for a complete response.
    pub fn finish_response<B>(
        &self,
        csp: &mut RequestCsp,
        response: &mut Response<B>,
    ) -> SecurityResult<()> {
        self.finish(csp, response.headers_mut())
    }
}

impl std::fmt::Debug for CspMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CspMiddleware")
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}
