//! Policy lookup for the request pipeline.

use http::request::Parts;
use std::borrow::Cow;
use std::sync::Arc;
use vigil_csp::{Policy, PolicyRegistry};

/// Supplies registered policies to the middleware.
///
/// `name = None` asks for the default policy. Implementations may vary the
/// answer by request (tenant, host, ...).
pub trait PolicyProvider: Send + Sync {
    fn get_policy<'a>(&'a self, request: &Parts, name: Option<&str>) -> Option<Cow<'a, Policy>>;

    /// Name the default policy is registered under.
    fn default_policy_name(&self) -> &str;
}

impl PolicyProvider for PolicyRegistry {
    fn get_policy<'a>(&'a self, _request: &Parts, name: Option<&str>) -> Option<Cow<'a, Policy>> {
        self.resolve(name).map(Cow::Borrowed)
    }

    fn default_policy_name(&self) -> &str {
        PolicyRegistry::default_policy_name(self)
    }
}

impl<P: PolicyProvider + ?Sized> PolicyProvider for Arc<P> {
    fn get_policy<'a>(&'a self, request: &Parts, name: Option<&str>) -> Option<Cow<'a, Policy>> {
        (**self).get_policy(request, name)
    }

    fn default_policy_name(&self) -> &str {
        (**self).default_policy_name()
    }
}
