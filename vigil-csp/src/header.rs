//! Policy serialization into `Content-Security-Policy` header values.

use crate::policy::Policy;
use std::cell::OnceCell;
use std::fmt;
use tracing::debug;

/// Enforcing header name.
pub const CONTENT_SECURITY_POLICY: &str = "Content-Security-Policy";

/// Report-only header name.
pub const CONTENT_SECURITY_POLICY_REPORT_ONLY: &str = "Content-Security-Policy-Report-Only";

/// Supplies the nonce of the current request.
///
/// Implementations must return the same value for every call within one request.
pub trait NonceSource {
    fn nonce(&self) -> String;
}

impl NonceSource for str {
    fn nonce(&self) -> String {
        self.to_string()
    }
}

impl NonceSource for String {
    fn nonce(&self) -> String {
        self.clone()
    }
}

/// Where a rendered policy will be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderTarget {
    /// HTTP response header
    #[default]
    Header,
    /// `<meta http-equiv>` element; some directives are ignored there
    MetaTag,
}

/// A rendered header name and value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CspHeader {
    pub name: &'static str,
    pub value: String,
}

impl CspHeader {
    /// Render as an HTML `<meta http-equiv>` element.
    pub fn to_meta_tag(&self) -> String {
        format!(
            "<meta http-equiv=\"{}\" content=\"{}\">",
            escape_attribute(self.name),
            escape_attribute(&self.value)
        )
    }
}

impl fmt::Display for CspHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// Serialize `policy` for `target`.
///
/// Directives not honoured by the target (or by the report-only header) are
/// skipped. The nonce is requested at most once, and only when an included
/// directive asks for it.
pub fn render<N>(policy: &Policy, nonce_source: &N, target: RenderTarget) -> CspHeader
where
    N: NonceSource + ?Sized,
{
    let report_only = policy.report_only();
    let name = if report_only {
        CONTENT_SECURITY_POLICY_REPORT_ONLY
    } else {
        CONTENT_SECURITY_POLICY
    };

    let nonce = OnceCell::new();
    let mut segments = Vec::with_capacity(policy.len());

    for (directive_name, directive) in policy.directives() {
        if target == RenderTarget::MetaTag && !directive.supports_meta_tag() {
            continue;
        }
        if report_only && !directive.supports_report_header() {
            continue;
        }

        let mut segment = String::from(directive_name);
        if !directive.is_empty() {
            segment.push(' ');
            segment.push_str(directive.value());
        }
        if directive.requires_nonce() {
            let nonce = nonce.get_or_init(|| nonce_source.nonce());
            segment.push_str(" 'nonce-");
            segment.push_str(nonce);
            segment.push('\'');
        }
        segments.push(segment);
    }

    let value = segments.join("; ");
    debug!(header = name, target = ?target, directives = segments.len(), "Rendered CSP header");

    CspHeader { name, value }
}

impl Policy {
    /// Render as a response header.
    pub fn to_header<N: NonceSource + ?Sized>(&self, nonce_source: &N) -> CspHeader {
        render(self, nonce_source, RenderTarget::Header)
    }

    /// Render for a `<meta http-equiv>` element.
    pub fn to_meta_header<N: NonceSource + ?Sized>(&self, nonce_source: &N) -> CspHeader {
        render(self, nonce_source, RenderTarget::MetaTag)
    }
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
