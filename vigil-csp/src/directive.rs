//! A single CSP directive: its source list plus rendering metadata.

use crate::error::{CspResult, validate_token};
use crate::names::DirectiveName;
use serde::{Deserialize, Serialize};

/// The `'none'` source keyword.
pub const NONE_SOURCE: &str = "'none'";

/// Category of a directive.
///
/// Only [`DirectiveCategory::Fetch`] directives fall back to `default-src`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveCategory {
    /// Locations from which resource types may be loaded
    Fetch,
    /// Properties of the document or worker environment
    Document,
    /// Where the user can navigate or submit forms to
    Navigation,
    /// Violation reporting
    Reporting,
    /// Everything else
    Other,
}

/// A directive's accumulated source list and metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    value: String,
    category: DirectiveCategory,
    supports_meta_tag: bool,
    supports_report_header: bool,
    add_nonce: Option<bool>,
}

impl Directive {
    /// Create an empty directive with the given category, usable everywhere.
    pub fn new(category: DirectiveCategory) -> Self {
        Self {
            value: String::new(),
            category,
            supports_meta_tag: true,
            supports_report_header: true,
            add_nonce: None,
        }
    }

    /// Create an empty directive carrying the metadata of a well-known name.
    pub fn for_name(name: DirectiveName) -> Self {
        Self {
            value: String::new(),
            category: name.category(),
            supports_meta_tag: name.supports_meta_tag(),
            supports_report_header: name.supports_report_header(),
            add_nonce: None,
        }
    }

    /// Metadata for an arbitrary name; unknown names are `Other` and allowed everywhere.
    pub fn for_raw_name(name: &str) -> Self {
        name.parse::<DirectiveName>()
            .map(Self::for_name)
            .unwrap_or_else(|_| Self::new(DirectiveCategory::Other))
    }

    /// Space-joined source list.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Source tokens in order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.value.split(' ').filter(|s| !s.is_empty())
    }

    /// Whether the source list is empty.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn category(&self) -> DirectiveCategory {
        self.category
    }

    pub fn supports_meta_tag(&self) -> bool {
        self.supports_meta_tag
    }

    pub fn supports_report_header(&self) -> bool {
        self.supports_report_header
    }

    /// Tri-state nonce flag: `None` when never configured.
    pub fn add_nonce(&self) -> Option<bool> {
        self.add_nonce
    }

    /// Whether a nonce is rendered for this directive.
    pub fn requires_nonce(&self) -> bool {
        self.add_nonce == Some(true)
    }

    pub fn set_add_nonce(&mut self, add_nonce: bool) {
        self.add_nonce = Some(add_nonce);
    }

    pub fn set_category(&mut self, category: DirectiveCategory) {
        self.category = category;
    }

    pub fn set_supports_meta_tag(&mut self, supports: bool) {
        self.supports_meta_tag = supports;
    }

    pub fn set_supports_report_header(&mut self, supports: bool) {
        self.supports_report_header = supports;
    }

    /// Append a source token verbatim.
    pub fn append(&mut self, source: &str) -> CspResult<()> {
        validate_token("source", source)?;
        self.push_token(source.trim());
        Ok(())
    }

    /// Append several source tokens; nothing is appended unless all are valid.
    pub fn append_all<I, S>(&mut self, sources: I) -> CspResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sources: Vec<S> = sources.into_iter().collect();
        for source in &sources {
            validate_token("source", source.as_ref())?;
        }
        for source in &sources {
            self.push_token(source.as_ref().trim());
        }
        Ok(())
    }

    /// Append a token enclosed in single quotes, e.g. `'sha256-...'`.
    pub fn append_quoted(&mut self, source: &str) -> CspResult<()> {
        validate_token("source", source)?;
        self.push_token(&format!("'{}'", source.trim()));
        Ok(())
    }

    /// An empty directive with the same metadata and no nonce setting.
    pub fn empty_like(&self) -> Self {
        Self {
            value: String::new(),
            category: self.category,
            supports_meta_tag: self.supports_meta_tag,
            supports_report_header: self.supports_report_header,
            add_nonce: None,
        }
    }

    /// Append another directive's sources and its nonce flag if it set one.
    pub(crate) fn append_from(&mut self, other: &Directive) {
        self.push_token(&other.value);
        if let Some(add_nonce) = other.add_nonce {
            self.add_nonce = Some(add_nonce);
        }
    }

    /// Raw append. A lone `'none'` is replaced rather than extended.
    pub(crate) fn push_token(&mut self, token: &str) {
        if token.is_empty() {
            return;
        }

        if self.value == NONE_SOURCE {
            self.value.clear();
        }

        if !self.value.is_empty() {
            self.value.push(' ');
        }
        self.value.push_str(token);
    }
}

impl Default for Directive {
    fn default() -> Self {
        Self::new(DirectiveCategory::Other)
    }
}
