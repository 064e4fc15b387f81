//! Fluent builders for directive source lists.
//!
//! ```
//! use vigil_csp::{DirectiveBuilder, SourceListBuilder, schemes};
//!
//! let directive = DirectiveBuilder::new()
//!     .allow_self()
//!     .allow_schema(schemes::HTTPS)
//!     .unwrap()
//!     .allow_host("cdn.example.org")
//!     .unwrap()
//!     .build();
//!
//! assert_eq!(directive.value(), "'self' https: cdn.example.org");
//! ```

use crate::directive::Directive;
use crate::error::{CspError, CspResult};

/// Source-list operations shared by every directive builder.
///
/// Keyword methods cannot fail; methods taking caller input validate it first.
pub trait SourceListBuilder: Sized {
    /// Directive being assembled.
    fn directive_mut(&mut self) -> &mut Directive;

    /// Finish building.
    fn build(self) -> Directive;

    /// Append an arbitrary source token.
    fn allow_source(mut self, source: &str) -> CspResult<Self> {
        self.directive_mut().append(source)?;
        Ok(self)
    }

    /// Allow a host, e.g. `example.org` or `*.example.org`.
    fn allow_host(self, host: &str) -> CspResult<Self> {
        self.allow_source(host)
    }

    /// Allow a scheme, e.g. [`schemes::HTTPS`](crate::schemes::HTTPS).
    fn allow_schema(self, scheme: &str) -> CspResult<Self> {
        self.allow_source(scheme)
    }

    /// Allow an inline element by hash (`sha256-...`), appended quoted.
    fn allow_hash(mut self, hash: &str) -> CspResult<Self> {
        if hash.trim().is_empty() {
            return Err(CspError::invalid_argument("hash", "value cannot be empty"));
        }
        self.directive_mut().append_quoted(hash)?;
        Ok(self)
    }

    /// `'self'`
    fn allow_self(mut self) -> Self {
        self.directive_mut().push_token("'self'");
        self
    }

    /// `'unsafe-inline'`
    fn allow_unsafe_inline(mut self) -> Self {
        self.directive_mut().push_token("'unsafe-inline'");
        self
    }

    /// `'unsafe-eval'`
    fn allow_eval(mut self) -> Self {
        self.directive_mut().push_token("'unsafe-eval'");
        self
    }

    /// `'none'`
    fn allow_none(mut self) -> Self {
        self.directive_mut().push_token(crate::directive::NONE_SOURCE);
        self
    }

    /// `'strict-dynamic'`
    fn use_strict_dynamic(mut self) -> Self {
        self.directive_mut().push_token("'strict-dynamic'");
        self
    }

    /// Render the request nonce with this directive.
    fn add_nonce(mut self) -> Self {
        self.directive_mut().set_add_nonce(true);
        self
    }
}

/// Builder for a generic source-list directive.
#[derive(Debug, Clone, Default)]
pub struct DirectiveBuilder {
    directive: Directive,
}

impl DirectiveBuilder {
    /// Create a new builder with an empty source list.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SourceListBuilder for DirectiveBuilder {
    fn directive_mut(&mut self) -> &mut Directive {
        &mut self.directive
    }

    fn build(self) -> Directive {
        self.directive
    }
}

impl From<DirectiveBuilder> for Directive {
    fn from(builder: DirectiveBuilder) -> Self {
        builder.build()
    }
}

/// Builder for `script-src`, which additionally supports `'report-sample'`.
#[derive(Debug, Clone, Default)]
pub struct ScriptDirectiveBuilder {
    directive: Directive,
}

impl ScriptDirectiveBuilder {
    /// Create a new builder with an empty source list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the browser to include a sample of the violating code in reports.
    pub fn require_sample_in_report(mut self) -> Self {
        self.directive.push_token("'report-sample'");
        self
    }
}

impl SourceListBuilder for ScriptDirectiveBuilder {
    fn directive_mut(&mut self) -> &mut Directive {
        &mut self.directive
    }

    fn build(self) -> Directive {
        self.directive
    }
}

impl From<ScriptDirectiveBuilder> for Directive {
    fn from(builder: ScriptDirectiveBuilder) -> Self {
        builder.build()
    }
}
