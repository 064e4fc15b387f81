// Vigil - Content-Security-Policy composition for Rust web applications
//
// This library re-exports the policy model and, behind features, the
// configuration loader and the request-time middleware.

// Re-export the policy model
pub use vigil_csp::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use vigil_config;

#[cfg(feature = "security")]
pub use vigil_security;
