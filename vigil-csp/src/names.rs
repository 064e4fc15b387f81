//! Well-known directive names, their categories and where they may appear.

use crate::directive::DirectiveCategory;
use std::fmt;
use std::str::FromStr;

/// Schemes that can be allowed as content sources.
pub mod schemes {
    /// Allows `http:` URIs.
    pub const HTTP: &str = "http:";
    /// Allows `https:` URIs.
    pub const HTTPS: &str = "https:";
    /// Allows `data:` URIs. Attackers can inject these too, never use it for scripts.
    pub const DATA: &str = "data:";
    /// Allows `mediastream:` URIs.
    pub const MEDIA_STREAM: &str = "mediastream:";
    /// Allows `blob:` URIs.
    pub const BLOB: &str = "blob:";
    /// Allows `filesystem:` URIs.
    pub const FILE_SYSTEM: &str = "filesystem:";
}

/// Directives the policy builder knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveName {
    // Fetch
    DefaultSrc,
    ConnectSrc,
    FontSrc,
    FrameSrc,
    ImgSrc,
    ManifestSrc,
    MediaSrc,
    ObjectSrc,
    ScriptSrc,
    StyleSrc,
    WorkerSrc,
    // Document
    BaseUri,
    PluginTypes,
    Sandbox,
    // Navigation
    FormAction,
    FrameAncestors,
    // Reporting
    ReportUri,
    ReportTo,
    // Other
    BlockAllMixedContent,
    RequireSriFor,
    UpgradeInsecureRequests,
}

impl DirectiveName {
    /// Every well-known directive, in declaration order.
    pub const ALL: [DirectiveName; 21] = [
        DirectiveName::DefaultSrc,
        DirectiveName::ConnectSrc,
        DirectiveName::FontSrc,
        DirectiveName::FrameSrc,
        DirectiveName::ImgSrc,
        DirectiveName::ManifestSrc,
        DirectiveName::MediaSrc,
        DirectiveName::ObjectSrc,
        DirectiveName::ScriptSrc,
        DirectiveName::StyleSrc,
        DirectiveName::WorkerSrc,
        DirectiveName::BaseUri,
        DirectiveName::PluginTypes,
        DirectiveName::Sandbox,
        DirectiveName::FormAction,
        DirectiveName::FrameAncestors,
        DirectiveName::ReportUri,
        DirectiveName::ReportTo,
        DirectiveName::BlockAllMixedContent,
        DirectiveName::RequireSriFor,
        DirectiveName::UpgradeInsecureRequests,
    ];

    /// Wire name of the directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveName::DefaultSrc => "default-src",
            DirectiveName::ConnectSrc => "connect-src",
            DirectiveName::FontSrc => "font-src",
            DirectiveName::FrameSrc => "frame-src",
            DirectiveName::ImgSrc => "img-src",
            DirectiveName::ManifestSrc => "manifest-src",
            DirectiveName::MediaSrc => "media-src",
            DirectiveName::ObjectSrc => "object-src",
            DirectiveName::ScriptSrc => "script-src",
            DirectiveName::StyleSrc => "style-src",
            DirectiveName::WorkerSrc => "worker-src",
            DirectiveName::BaseUri => "base-uri",
            DirectiveName::PluginTypes => "plugin-types",
            DirectiveName::Sandbox => "sandbox",
            DirectiveName::FormAction => "form-action",
            DirectiveName::FrameAncestors => "frame-ancestors",
            DirectiveName::ReportUri => "report-uri",
            DirectiveName::ReportTo => "report-to",
            DirectiveName::BlockAllMixedContent => "block-all-mixed-content",
            DirectiveName::RequireSriFor => "require-sri-for",
            DirectiveName::UpgradeInsecureRequests => "upgrade-insecure-requests",
        }
    }

    /// Category of the directive.
    pub fn category(&self) -> DirectiveCategory {
        match self {
            DirectiveName::DefaultSrc
            | DirectiveName::ConnectSrc
            | DirectiveName::FontSrc
            | DirectiveName::FrameSrc
            | DirectiveName::ImgSrc
            | DirectiveName::ManifestSrc
            | DirectiveName::MediaSrc
            | DirectiveName::ObjectSrc
            | DirectiveName::ScriptSrc
            | DirectiveName::StyleSrc
            | DirectiveName::WorkerSrc => DirectiveCategory::Fetch,
            DirectiveName::BaseUri | DirectiveName::PluginTypes | DirectiveName::Sandbox => {
                DirectiveCategory::Document
            }
            DirectiveName::FormAction | DirectiveName::FrameAncestors => {
                DirectiveCategory::Navigation
            }
            DirectiveName::ReportUri | DirectiveName::ReportTo => DirectiveCategory::Reporting,
            DirectiveName::BlockAllMixedContent
            | DirectiveName::RequireSriFor
            | DirectiveName::UpgradeInsecureRequests => DirectiveCategory::Other,
        }
    }

    /// Whether the directive is honoured inside `<meta http-equiv>`.
    pub fn supports_meta_tag(&self) -> bool {
        !matches!(
            self,
            DirectiveName::Sandbox
                | DirectiveName::FrameAncestors
                | DirectiveName::ReportUri
                | DirectiveName::ReportTo
        )
    }

    /// Whether the directive is honoured in a report-only header.
    pub fn supports_report_header(&self) -> bool {
        !matches!(self, DirectiveName::Sandbox)
    }
}

impl fmt::Display for DirectiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DirectiveName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        // Older spelling used by some configurations.
        if lower == "image-src" {
            return Ok(DirectiveName::ImgSrc);
        }
        DirectiveName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == lower)
            .ok_or(())
    }
}

impl AsRef<str> for DirectiveName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
