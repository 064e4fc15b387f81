//! Vocabulary for `sandbox` and `require-sri-for`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Permission tokens accepted by the `sandbox` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SandboxPermission {
    AllowForms,
    AllowModals,
    AllowOrientationLock,
    AllowPointerLock,
    AllowPopups,
    AllowPopupsToEscapeSandbox,
    AllowPresentation,
    AllowSameOrigin,
    AllowScripts,
    AllowTopNavigation,
}

impl SandboxPermission {
    pub const ALL: [SandboxPermission; 10] = [
        SandboxPermission::AllowForms,
        SandboxPermission::AllowModals,
        SandboxPermission::AllowOrientationLock,
        SandboxPermission::AllowPointerLock,
        SandboxPermission::AllowPopups,
        SandboxPermission::AllowPopupsToEscapeSandbox,
        SandboxPermission::AllowPresentation,
        SandboxPermission::AllowSameOrigin,
        SandboxPermission::AllowScripts,
        SandboxPermission::AllowTopNavigation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SandboxPermission::AllowForms => "allow-forms",
            SandboxPermission::AllowModals => "allow-modals",
            SandboxPermission::AllowOrientationLock => "allow-orientation-lock",
            SandboxPermission::AllowPointerLock => "allow-pointer-lock",
            SandboxPermission::AllowPopups => "allow-popups",
            SandboxPermission::AllowPopupsToEscapeSandbox => "allow-popups-to-escape-sandbox",
            SandboxPermission::AllowPresentation => "allow-presentation",
            SandboxPermission::AllowSameOrigin => "allow-same-origin",
            SandboxPermission::AllowScripts => "allow-scripts",
            SandboxPermission::AllowTopNavigation => "allow-top-navigation",
        }
    }
}

impl fmt::Display for SandboxPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SandboxPermission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        SandboxPermission::ALL
            .iter()
            .copied()
            .find(|perm| perm.as_str() == lower)
            .ok_or_else(|| s.to_string())
    }
}

/// Resource kinds for `require-sri-for`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subresource {
    Script,
    Style,
}

impl Subresource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subresource::Script => "script",
            Subresource::Style => "style",
        }
    }
}

impl fmt::Display for Subresource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subresource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "script" => Ok(Subresource::Script),
            "style" => Ok(Subresource::Style),
            _ => Err(s.to_string()),
        }
    }
}
