//! Route-driven policy selection.
//!
//! A [`RouteTable`] maps route keys to ordered [`CspOperation`]s layered on
//! top of global operations. Each route's operations are resolved once, when
//! the table is built, into a [`RoutePlan`]:
//!
//! - any `Disable` switches CSP off for the route;
//! - otherwise the last `Enable` selects the active policies (an empty
//!   list means the default policy);
//! - without an `Enable`, no CSP header is written;
//! - every `Append` / `Override` is kept, in order, as a modifier applied
//!   just before the headers are written.
//!
//! ```
//! use vigil_csp::prelude::*;
//! use vigil_security::routes::{CspOperation, RouteTable};
//!
//! let report_widget = PolicyBuilder::new()
//!     .add_frame_src(DirectiveBuilder::new().allow_host("widgets.example.org").unwrap())
//!     .build();
//!
//! let routes = RouteTable::builder()
//!     .global(CspOperation::enable_default())
//!     .route("/dashboard", CspOperation::append("", report_widget))
//!     .route("/legacy", CspOperation::disable())
//!     .build();
//!
//! assert!(routes.plan(Some("/legacy")).is_none());
//! assert_eq!(routes.plan(Some("/dashboard")).unwrap().modifiers().len(), 1);
//! assert!(routes.plan(Some("/other")).unwrap().modifiers().is_empty());
//! ```

use crate::error::{SecurityError, SecurityResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use vigil_csp::{MergeMode, Policy, PolicyRegistry};

/// One policy operation attached to a route or to every route.
#[derive(Debug, Clone)]
pub enum CspOperation {
    /// Activate the named policies; empty means the default policy
    Enable(Vec<String>),
    /// Send no CSP header
    Disable,
    /// Merge `policy` into the target policies
    Modify(Modifier),
}

impl CspOperation {
    /// Enable a comma-separated list of policies, e.g. `"main,reporting"`.
    pub fn enable(policy_names: &str) -> Self {
        Self::Enable(split_names(policy_names))
    }

    /// Enable the default policy.
    pub fn enable_default() -> Self {
        Self::Enable(Vec::new())
    }

    pub fn disable() -> Self {
        Self::Disable
    }

    /// Append `policy` to the comma-separated `targets` (empty: the main policy).
    pub fn append(targets: &str, policy: Policy) -> Self {
        Self::Modify(Modifier::new(MergeMode::Append, targets, policy))
    }

    /// Override the comma-separated `targets` (empty: the main policy) with `policy`.
    pub fn override_with(targets: &str, policy: Policy) -> Self {
        Self::Modify(Modifier::new(MergeMode::Override, targets, policy))
    }
}

/// A pending append or override.
#[derive(Debug, Clone)]
pub struct Modifier {
    mode: MergeMode,
    targets: Vec<String>,
    policy: Arc<Policy>,
}

impl Modifier {
    pub fn new(mode: MergeMode, targets: &str, policy: Policy) -> Self {
        Self {
            mode,
            targets: split_names(targets),
            policy: Arc::new(policy),
        }
    }

    pub fn mode(&self) -> MergeMode {
        self.mode
    }

    /// Target policy names; empty means the main active policy.
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }
}

/// Resolved CSP behaviour of one route.
#[derive(Debug, Clone, Default)]
pub struct RoutePlan {
    policies: Vec<String>,
    modifiers: Vec<Modifier>,
}

impl RoutePlan {
    /// Active policy names in order; empty means the default policy.
    pub fn policies(&self) -> &[String] {
        &self.policies
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    fn resolve<'a>(operations: impl Iterator<Item = &'a CspOperation>) -> Option<Self> {
        let mut enabled: Option<Vec<String>> = None;
        let mut modifiers = Vec::new();

        for operation in operations {
            match operation {
                CspOperation::Disable => return None,
                CspOperation::Enable(names) => enabled = Some(names.clone()),
                CspOperation::Modify(modifier) => modifiers.push(modifier.clone()),
            }
        }

        enabled.map(|policies| Self {
            policies,
            modifiers,
        })
    }

    fn policy_names<'a>(&'a self, registry: &'a PolicyRegistry) -> Vec<&'a str> {
        if self.policies.is_empty() {
            vec![registry.default_policy_name()]
        } else {
            self.policies.iter().map(String::as_str).collect()
        }
    }
}

/// Precomputed route plans, shared read-only across requests.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    global: Option<Arc<RoutePlan>>,
    routes: HashMap<String, Option<Arc<RoutePlan>>>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::new()
    }

    /// A table that enables the default policy everywhere.
    pub fn enable_default() -> Self {
        Self::builder().global(CspOperation::enable_default()).build()
    }

    /// Plan for `route`; unknown or missing routes get the global plan.
    /// `None` means CSP is not applied.
    pub fn plan(&self, route: Option<&str>) -> Option<&Arc<RoutePlan>> {
        match route.and_then(|key| self.routes.get(key)) {
            Some(plan) => plan.as_ref(),
            None => self.global.as_ref(),
        }
    }

    /// Check that every policy a plan refers to is registered.
    pub fn validate(&self, registry: &PolicyRegistry) -> SecurityResult<()> {
        let global = self.global.iter().map(|plan| ("<global>", plan));
        let routes = self
            .routes
            .iter()
            .filter_map(|(key, plan)| plan.as_ref().map(|plan| (key.as_str(), plan)));

        for (route, plan) in global.chain(routes) {
            let active = plan.policy_names(registry);
            for name in &active {
                if !registry.contains(name) {
                    return Err(SecurityError::misconfiguration(format!(
                        "route `{}` enables policy `{}`, which is not registered",
                        route, name
                    )));
                }
            }

            for modifier in &plan.modifiers {
                if let Some(target) = modifier
                    .targets
                    .iter()
                    .find(|target| !active.contains(&target.as_str()))
                {
                    return Err(SecurityError::misconfiguration(format!(
                        "route `{}` modifies policy `{}`, which is not active",
                        route, target
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Builder for [`RouteTable`].
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    global: Vec<CspOperation>,
    routes: HashMap<String, Vec<CspOperation>>,
    order: Vec<String>,
}

impl RouteTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation that applies to every route.
    pub fn global(mut self, operation: CspOperation) -> Self {
        self.global.push(operation);
        self
    }

    /// Add an operation for one route key. Route operations follow global ones.
    pub fn route(mut self, key: impl Into<String>, operation: CspOperation) -> Self {
        let key = key.into();
        if !self.routes.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.routes.entry(key).or_default().push(operation);
        self
    }

    pub fn build(mut self) -> RouteTable {
        let global = RoutePlan::resolve(self.global.iter()).map(Arc::new);

        let mut routes = HashMap::with_capacity(self.order.len());
        for key in self.order {
            let operations = self.routes.remove(&key).unwrap_or_default();
            let plan = RoutePlan::resolve(self.global.iter().chain(operations.iter())).map(Arc::new);

            debug!(
                route = %key,
                enabled = plan.is_some(),
                modifiers = plan.as_ref().map_or(0, |p| p.modifiers.len()),
                "Built CSP route plan"
            );
            routes.insert(key, plan);
        }

        RouteTable { global, routes }
    }
}

/// Comma-separated names, trimmed, first occurrence wins.
fn split_names(names: &str) -> Vec<String> {
    let mut split: Vec<String> = Vec::new();
    for name in names.split(',').map(str::trim) {
        if !name.is_empty() && !split.iter().any(|seen| seen == name) {
            split.push(name.to_string());
        }
    }
    split
}
