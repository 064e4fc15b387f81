//! Request-time Content-Security-Policy handling for Vigil.
//!
//! This crate sits between an HTTP server and [`vigil_csp`]. It selects the
//! active policies for each request, hands out nonces and hashes while the
//! response is rendered, and writes the resulting headers.
//!
//! # Example
//!
//! ```
//! use http::Request;
//! use vigil_csp::prelude::*;
//! use vigil_security::prelude::*;
//!
//! let mut registry = PolicyRegistry::new();
//! registry
//!     .add_policy(
//!         "main",
//!         PolicyBuilder::new()
//!             .add_default_src(DirectiveBuilder::new().allow_self())
//!             .build(),
//!     )
//!     .unwrap();
//!
//! let middleware = CspMiddleware::new(registry)
//!     .with_routes(RouteTable::builder().global(CspOperation::enable("main")).build())
//!     .with_nonce_provider(FixedNonceProvider::new("r4nd0m"));
//!
//! let (parts, _) = Request::new(()).into_parts();
//! let mut csp = middleware.begin(Some("/home"), &parts).unwrap().unwrap();
//!
//! // While rendering the page
//! let nonce = csp.add_nonce(InlineKind::Script).unwrap();
//! assert_eq!(nonce, "r4nd0m");
//!
//! let mut response = http::Response::new(());
//! middleware.finish_response(&mut csp, &mut response).unwrap();
//! assert_eq!(
//!     response.headers()["content-security-policy"],
//!     "default-src 'self'; script-src 'nonce-r4nd0m'"
//! );
//! ```

pub mod context;
pub mod error;
pub mod hash_provider;
pub mod helpers;
pub mod middleware;
pub mod nonce;
pub mod provider;
pub mod report;
pub mod routes;

pub use context::{InlineKind, RequestCsp};
pub use error::{SecurityError, SecurityResult};
pub use hash_provider::{DefaultHashProvider, HashProvider, compute_hashes};
pub use helpers::{
    fallback_script_hashes, inline_hashes, inline_script_hashes, inline_style_hashes,
    subresource_integrity,
};
pub use middleware::CspMiddleware;
pub use nonce::{FixedNonceProvider, NonceProvider, RandomNonceProvider};
pub use provider::PolicyProvider;
pub use report::{CSP_REPORT_CONTENT_TYPE, CspReport, CspReportRequest, parse_report};
pub use routes::{CspOperation, Modifier, RoutePlan, RouteTable, RouteTableBuilder};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::context::{InlineKind, RequestCsp};
    pub use crate::error::{SecurityError, SecurityResult};
    pub use crate::hash_provider::{DefaultHashProvider, HashProvider};
    pub use crate::middleware::CspMiddleware;
    pub use crate::nonce::{FixedNonceProvider, NonceProvider, RandomNonceProvider};
    pub use crate::provider::PolicyProvider;
    pub use crate::routes::{CspOperation, RouteTable};
}
