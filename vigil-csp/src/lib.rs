//! Content-Security-Policy composition and header rendering for Vigil.
//!
//! Policies are assembled from directives with fluent builders, merged with
//! append or override semantics, and rendered into a
//! `Content-Security-Policy` (or `-Report-Only`) header value.
//!
//! # Example
//!
//! ```
//! use vigil_csp::prelude::*;
//!
//! let mut policy = PolicyBuilder::new()
//!     .add_default_src(DirectiveBuilder::new().allow_self())
//!     .add_script_src(ScriptDirectiveBuilder::new().allow_none().add_nonce())
//!     .build();
//!
//! // Route-specific additions
//! let extra = PolicyBuilder::new()
//!     .add_script_src(ScriptDirectiveBuilder::new().allow_host("example.org").unwrap())
//!     .add_object_src(DirectiveBuilder::new().allow_host("dot.net").unwrap())
//!     .build();
//! policy.append(&extra);
//!
//! let header = policy.to_header("r4nd0m");
//! assert_eq!(header.name, "Content-Security-Policy");
//! assert_eq!(
//!     header.value,
//!     "default-src 'self'; script-src 'self' example.org 'nonce-r4nd0m'; object-src dot.net"
//! );
//! ```
//!
//! Named policies live in a [`PolicyRegistry`], which ships with a secure
//! built-in default.

pub mod directive;
pub mod directive_builder;
pub mod error;
pub mod hash;
pub mod header;
pub mod names;
pub mod policy;
pub mod policy_builder;
pub mod registry;
pub mod sandbox;

pub use directive::{Directive, DirectiveCategory, NONE_SOURCE};
pub use directive_builder::{DirectiveBuilder, ScriptDirectiveBuilder, SourceListBuilder};
pub use error::{CspError, CspResult};
pub use hash::HashAlgorithms;
pub use header::{
    CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY_REPORT_ONLY, CspHeader, NonceSource,
    RenderTarget, render,
};
pub use names::{DirectiveName, schemes};
pub use policy::{MergeMode, Policy};
pub use policy_builder::PolicyBuilder;
pub use registry::{BUILT_IN_POLICY_NAME, PolicyRegistry, built_in_policy};
pub use sandbox::{SandboxPermission, Subresource};

/// Prelude for common imports.
///
/// ```
/// use vigil_csp::prelude::*;
/// ```
pub mod prelude {
    pub use crate::directive::{Directive, DirectiveCategory};
    pub use crate::directive_builder::{
        DirectiveBuilder, ScriptDirectiveBuilder, SourceListBuilder,
    };
    pub use crate::error::{CspError, CspResult};
    pub use crate::hash::HashAlgorithms;
    pub use crate::header::{CspHeader, NonceSource, RenderTarget};
    pub use crate::names::{DirectiveName, schemes};
    pub use crate::policy::{MergeMode, Policy};
    pub use crate::policy_builder::PolicyBuilder;
    pub use crate::registry::PolicyRegistry;
    pub use crate::sandbox::{SandboxPermission, Subresource};
}
