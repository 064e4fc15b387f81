//! Fluent construction of a [`Policy`].

use crate::directive::Directive;
use crate::directive_builder::{DirectiveBuilder, ScriptDirectiveBuilder, SourceListBuilder};
use crate::error::{CspError, CspResult, validate_token};
use crate::hash::HashAlgorithms;
use crate::names::DirectiveName;
use crate::policy::Policy;
use crate::sandbox::{SandboxPermission, Subresource};
use tracing::debug;

/// Builder for [`Policy`].
///
/// Each `add_*` method places its directive with the category and
/// applicability of the well-known directive it names.
///
/// # Examples
///
/// ```
/// use vigil_csp::{DirectiveBuilder, PolicyBuilder, ScriptDirectiveBuilder, SourceListBuilder};
///
/// let policy = PolicyBuilder::new()
///     .add_default_src(DirectiveBuilder::new().allow_self())
///     .add_script_src(ScriptDirectiveBuilder::new().allow_none())
///     .build();
///
/// assert_eq!(policy.to_header("").value, "default-src 'self'; script-src 'none'");
/// ```
#[derive(Debug, Default)]
pub struct PolicyBuilder {
    policy: Policy,
}

impl PolicyBuilder {
    /// Create a new builder with no directives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add any well-known directive.
    pub fn add_directive(mut self, name: DirectiveName, directive: impl Into<Directive>) -> Self {
        self.insert(name, directive.into());
        self
    }

    fn insert(&mut self, name: DirectiveName, mut directive: Directive) {
        directive.set_category(name.category());
        directive.set_supports_meta_tag(name.supports_meta_tag());
        directive.set_supports_report_header(name.supports_report_header());

        // Well-known names never fail validation.
        if self.policy.add_directive(name.as_str(), directive).is_ok() {
            debug!(directive = %name, "Added directive to policy");
        }
    }

    // Fetch directives

    pub fn add_default_src(self, builder: DirectiveBuilder) -> Self {
        self.add_directive(DirectiveName::DefaultSrc, builder)
    }

    pub fn add_connect_src(self, builder: DirectiveBuilder) -> Self {
        self.add_directive(DirectiveName::ConnectSrc, builder)
    }

    pub fn add_font_src(self, builder: DirectiveBuilder) -> Self {
        self.add_directive(DirectiveName::FontSrc, builder)
    }

    pub fn add_frame_src(self, builder: DirectiveBuilder) -> Self {
        self.add_directive(DirectiveName::FrameSrc, builder)
    }

    /// `img-src`
    pub fn add_img_src(self, builder: DirectiveBuilder) -> Self {
        self.add_directive(DirectiveName::ImgSrc, builder)
    }

    pub fn add_manifest_src(self, builder: DirectiveBuilder) -> Self {
        self.add_directive(DirectiveName::ManifestSrc, builder)
    }

    pub fn add_media_src(self, builder: DirectiveBuilder) -> Self {
        self.add_directive(DirectiveName::MediaSrc, builder)
    }

    pub fn add_object_src(self, builder: DirectiveBuilder) -> Self {
        self.add_directive(DirectiveName::ObjectSrc, builder)
    }

    pub fn add_script_src(self, builder: ScriptDirectiveBuilder) -> Self {
        self.add_directive(DirectiveName::ScriptSrc, builder)
    }

    pub fn add_style_src(self, builder: DirectiveBuilder) -> Self {
        self.add_directive(DirectiveName::StyleSrc, builder)
    }

    pub fn add_worker_src(self, builder: DirectiveBuilder) -> Self {
        self.add_directive(DirectiveName::WorkerSrc, builder)
    }

    // Document directives

    pub fn add_base_uri(self, builder: DirectiveBuilder) -> Self {
        self.add_directive(DirectiveName::BaseUri, builder)
    }

    /// Restrict embeddable plugins to the given MIME types.
    pub fn add_plugin_types<I, S>(self, mime_types: I) -> CspResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut directive = Directive::for_name(DirectiveName::PluginTypes);
        directive.append_all(mime_types)?;
        Ok(self.add_directive(DirectiveName::PluginTypes, directive))
    }

    /// Sandbox the document. An empty slice applies every restriction.
    pub fn add_sandbox(self, permissions: &[SandboxPermission]) -> Self {
        let mut directive = Directive::for_name(DirectiveName::Sandbox);
        for permission in permissions {
            directive.push_token(permission.as_str());
        }
        self.add_directive(DirectiveName::Sandbox, directive)
    }

    // Navigation directives

    pub fn add_form_action(self, builder: DirectiveBuilder) -> Self {
        self.add_directive(DirectiveName::FormAction, builder)
    }

    pub fn add_frame_ancestors(self, builder: DirectiveBuilder) -> Self {
        self.add_directive(DirectiveName::FrameAncestors, builder)
    }

    // Reporting directives

    /// Send violation reports to `uri`.
    pub fn report_uri(self, uri: &str) -> CspResult<Self> {
        validate_token("uri", uri)?;
        let directive = DirectiveBuilder::new().allow_source(uri)?;
        Ok(self.add_directive(DirectiveName::ReportUri, directive))
    }

    /// Send violation reports to the named Reporting API group.
    pub fn report_to(self, group: &str) -> CspResult<Self> {
        validate_token("group", group)?;
        if group.trim().contains(' ') {
            return Err(CspError::invalid_argument(
                "group",
                "a reporting group name is a single token",
            ));
        }
        let directive = DirectiveBuilder::new().allow_source(group)?;
        Ok(self.add_directive(DirectiveName::ReportTo, directive))
    }

    // Other directives

    pub fn block_all_mixed_content(self) -> Self {
        self.add_directive(
            DirectiveName::BlockAllMixedContent,
            Directive::for_name(DirectiveName::BlockAllMixedContent),
        )
    }

    /// Require SRI for the given resource kinds; an empty slice means scripts and styles.
    pub fn require_subresource_integrity(self, subresources: &[Subresource]) -> Self {
        let subresources = if subresources.is_empty() {
            &[Subresource::Script, Subresource::Style][..]
        } else {
            subresources
        };

        let mut directive = Directive::for_name(DirectiveName::RequireSriFor);
        for subresource in subresources {
            directive.push_token(subresource.as_str());
        }
        self.add_directive(DirectiveName::RequireSriFor, directive)
    }

    pub fn upgrade_insecure_requests(self) -> Self {
        self.add_directive(
            DirectiveName::UpgradeInsecureRequests,
            Directive::for_name(DirectiveName::UpgradeInsecureRequests),
        )
    }

    // Policy settings

    /// Only report violations instead of enforcing the policy.
    pub fn report_only(mut self) -> Self {
        self.policy.set_report_only(true);
        self
    }

    /// Hash algorithms used when callers do not choose any.
    pub fn default_hash_algorithms(mut self, algorithms: HashAlgorithms) -> Self {
        self.policy.set_default_hash_algorithms(algorithms);
        self
    }

    /// Finish building.
    pub fn build(self) -> Policy {
        debug!(
            directives = self.policy.len(),
            report_only = self.policy.report_only(),
            "Built content security policy"
        );
        self.policy
    }
}
