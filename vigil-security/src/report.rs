//! Violation reports posted by browsers to `report-uri`.

use crate::error::SecurityResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Media type of a `report-uri` request body.
pub const CSP_REPORT_CONTENT_TYPE: &str = "application/csp-report";

/// A single violation. Browsers omit fields freely, so all are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CspReport {
    pub document_uri: Option<String>,
    pub referrer: Option<String>,
    pub violated_directive: Option<String>,
    pub effective_directive: Option<String>,
    pub original_policy: Option<String>,
    /// `enforce` or `report`
    pub disposition: Option<String>,
    pub blocked_uri: Option<String>,
    pub line_number: Option<u64>,
    pub column_number: Option<u64>,
    pub source_file: Option<String>,
    pub status_code: Option<u16>,
    pub script_sample: Option<String>,
}

impl CspReport {
    /// Whether the violation came from a report-only policy.
    pub fn is_report_only(&self) -> bool {
        self.disposition.as_deref() == Some("report")
    }

    /// The directive that was violated, preferring `effective-directive`.
    pub fn directive(&self) -> Option<&str> {
        self.effective_directive
            .as_deref()
            .or(self.violated_directive.as_deref())
    }
}

/// Body of an `application/csp-report` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CspReportRequest {
    #[serde(rename = "csp-report")]
    pub report: CspReport,
}

/// Parse a report body.
pub fn parse_report(body: &[u8]) -> SecurityResult<CspReport> {
    let request: CspReportRequest = serde_json::from_slice(body)?;
    debug!(
        document_uri = ?request.report.document_uri,
        directive = ?request.report.directive(),
        blocked_uri = ?request.report.blocked_uri,
        "Parsed CSP violation report"
    );
    Ok(request.report)
}
