//! Integration tests for vigil-security

use http::header::{CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY_REPORT_ONLY};
use http::request::Parts;
use http::{HeaderMap, Request};
use std::fs;
use vigil_csp::prelude::*;
use vigil_security::*;

const SITE_JS: &[u8] = b"console.log(\"site\");\n";
const SITE_JS_SHA256: &str = "sha256-L9nwddCeJeRFmdh8r7hL5cj5ONMv6cR2IPQwsswQbeU=";
const SITE_JS_SHA384: &str =
    "sha384-k71CnQ+ot+voFI6nOMQjrtnkkZKMu16C10HbMmQyI+qDOY/EQ3AQn4i9WdQAxsrj";
const ALERTS_SHA256: &str = "sha256-7UwwvT2LToirVR4qhM9BIwXo46wdfoUadlAcQ8GaEm4=";

fn parts() -> Parts {
    Request::new(()).into_parts().0
}

fn registry() -> PolicyRegistry {
    let mut registry = PolicyRegistry::new();
    registry
        .add_policy(
            "main",
            PolicyBuilder::new()
                .add_default_src(DirectiveBuilder::new().allow_self())
                .add_script_src(ScriptDirectiveBuilder::new().allow_none())
                .build(),
        )
        .unwrap();
    registry
        .add_policy(
            "reporting",
            PolicyBuilder::new()
                .add_default_src(DirectiveBuilder::new().allow_none())
                .add_sandbox(&[SandboxPermission::AllowScripts])
                .report_uri("/csp")
                .unwrap()
                .report_only()
                .build(),
        )
        .unwrap();
    registry
}

fn middleware(routes: RouteTable) -> CspMiddleware {
    CspMiddleware::new(registry())
        .with_routes(routes)
        .with_nonce_provider(FixedNonceProvider::new("abc"))
}

fn header_values(headers: &HeaderMap, name: http::header::HeaderName) -> Vec<String> {
    headers
        .get_all(name)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_append_modifier_on_route() {
    let addition = PolicyBuilder::new()
        .add_script_src(ScriptDirectiveBuilder::new().allow_host("example.org").unwrap())
        .add_object_src(DirectiveBuilder::new().allow_host("dot.net").unwrap())
        .build();
    let middleware = middleware(
        RouteTable::builder()
            .global(CspOperation::enable("main"))
            .route("/widgets", CspOperation::append("", addition))
            .build(),
    );

    let mut csp = middleware.begin(Some("/widgets"), &parts()).unwrap().unwrap();
    let mut headers = HeaderMap::new();
    middleware.finish(&mut csp, &mut headers).unwrap();

    assert_eq!(
        header_values(&headers, CONTENT_SECURITY_POLICY),
        vec!["default-src 'self'; script-src 'self' example.org; object-src dot.net"]
    );

    // Other routes are not affected by the modifier.
    let mut csp = middleware.begin(Some("/"), &parts()).unwrap().unwrap();
    let mut headers = HeaderMap::new();
    middleware.finish(&mut csp, &mut headers).unwrap();
    assert_eq!(
        header_values(&headers, CONTENT_SECURITY_POLICY),
        vec!["default-src 'self'; script-src 'none'"]
    );
}

#[test]
fn test_override_modifier_on_route() {
    let replacement = PolicyBuilder::new()
        .add_script_src(ScriptDirectiveBuilder::new().allow_host("example.org").unwrap())
        .add_object_src(DirectiveBuilder::new().allow_self())
        .build();
    let middleware = middleware(
        RouteTable::builder()
            .global(CspOperation::enable("main"))
            .route("/embed", CspOperation::override_with("main", replacement))
            .build(),
    );

    let mut csp = middleware.begin(Some("/embed"), &parts()).unwrap().unwrap();
    let mut headers = HeaderMap::new();
    middleware.finish(&mut csp, &mut headers).unwrap();

    assert_eq!(
        header_values(&headers, CONTENT_SECURITY_POLICY),
        vec!["default-src 'self'; script-src example.org; object-src 'self'"]
    );
}

#[test]
fn test_multiple_policies_emit_multiple_headers() {
    let middleware = middleware(
        RouteTable::builder()
            .global(CspOperation::enable("main,reporting"))
            .build(),
    );

    let mut csp = middleware.begin(None, &parts()).unwrap().unwrap();
    let mut headers = HeaderMap::new();
    middleware.finish(&mut csp, &mut headers).unwrap();

    assert_eq!(
        header_values(&headers, CONTENT_SECURITY_POLICY),
        vec!["default-src 'self'; script-src 'none'"]
    );
    // sandbox is not allowed in the report-only header
    assert_eq!(
        header_values(&headers, CONTENT_SECURITY_POLICY_REPORT_ONLY),
        vec!["default-src 'none'; report-uri /csp"]
    );
}

#[test]
fn test_registry_is_not_mutated_by_requests() {
    let middleware = middleware(RouteTable::builder().global(CspOperation::enable("main")).build());

    let mut first = middleware.begin(None, &parts()).unwrap().unwrap();
    first.add_nonce(InlineKind::Script).unwrap();
    first.allow_plugin_type("application/pdf").unwrap();

    let second = middleware.begin(None, &parts()).unwrap().unwrap();
    assert_eq!(
        second.headers()[0].value,
        "default-src 'self'; script-src 'none'"
    );
}

#[test]
fn test_nonce_shared_by_header_and_meta_tag() {
    let middleware = CspMiddleware::new(registry())
        .with_routes(RouteTable::builder().global(CspOperation::enable("main")).build());

    let mut csp = middleware.begin(None, &parts()).unwrap().unwrap();
    let nonce = csp.add_nonce(InlineKind::Style).unwrap();

    let meta = csp.meta_tags();
    let mut headers = HeaderMap::new();
    middleware.finish(&mut csp, &mut headers).unwrap();

    let expected = format!("style-src 'nonce-{}'", nonce);
    assert!(meta[0].contains(&expected));
    assert!(header_values(&headers, CONTENT_SECURITY_POLICY)[0].contains(&expected));
}

#[tokio::test]
async fn test_subresource_integrity() {
    let web_root = tempfile::tempdir().unwrap();
    fs::create_dir(web_root.path().join("js")).unwrap();
    fs::write(web_root.path().join("js/site.js"), SITE_JS).unwrap();

    let hasher = DefaultHashProvider::new(web_root.path()).with_path_base("/app");
    let middleware = middleware(RouteTable::builder().global(CspOperation::enable("main")).build());
    let mut csp = middleware.begin(None, &parts()).unwrap().unwrap();

    let integrity = subresource_integrity(
        &hasher,
        &mut csp,
        InlineKind::Script,
        "/app/js/site.js",
        Some(HashAlgorithms::SHA256 | HashAlgorithms::SHA384),
    )
    .await
    .unwrap();

    assert_eq!(integrity, format!("{} {}", SITE_JS_SHA256, SITE_JS_SHA384));
    assert_eq!(
        csp.headers()[0].value,
        format!(
            "default-src 'self'; script-src '{}' '{}'",
            SITE_JS_SHA256, SITE_JS_SHA384
        )
    );
}

#[tokio::test]
async fn test_subresource_integrity_uses_policy_default() {
    let web_root = tempfile::tempdir().unwrap();
    fs::write(web_root.path().join("site.js"), SITE_JS).unwrap();

    let mut registry = PolicyRegistry::empty();
    registry
        .add_default_policy(
            PolicyBuilder::new()
                .default_hash_algorithms(HashAlgorithms::SHA256)
                .build(),
        );
    let middleware = CspMiddleware::new(registry);
    let mut csp = middleware.begin(None, &parts()).unwrap().unwrap();

    let hasher = DefaultHashProvider::new(web_root.path());
    let integrity = subresource_integrity(&hasher, &mut csp, InlineKind::Script, "site.js", None)
        .await
        .unwrap();
    assert_eq!(integrity, SITE_JS_SHA256);
}

#[tokio::test]
async fn test_file_hashes_follow_file_changes() {
    let web_root = tempfile::tempdir().unwrap();
    let path = web_root.path().join("site.js");
    fs::write(&path, SITE_JS).unwrap();

    let hasher = DefaultHashProvider::new(web_root.path());
    let first = hasher
        .file_hashes("/site.js", HashAlgorithms::SHA256)
        .await
        .unwrap();
    assert_eq!(first, vec![SITE_JS_SHA256]);

    // Different length, so the cached entry is stale even with a coarse mtime.
    fs::write(&path, b"alert(1);\nalert(2);").unwrap();
    let second = hasher
        .file_hashes("/site.js", HashAlgorithms::SHA256)
        .await
        .unwrap();
    assert_eq!(second, vec![ALERTS_SHA256]);
}

#[tokio::test]
async fn test_missing_subresource() {
    let web_root = tempfile::tempdir().unwrap();
    let hasher = DefaultHashProvider::new(web_root.path());
    let middleware = middleware(RouteTable::builder().global(CspOperation::enable("main")).build());
    let mut csp = middleware.begin(None, &parts()).unwrap().unwrap();

    let err = subresource_integrity(&hasher, &mut csp, InlineKind::Style, "/css/missing.css", None)
        .await
        .unwrap_err();
    assert!(err.is_file_not_found());
    assert!(csp.main_policy().unwrap().directive("style-src").is_none());
}

#[tokio::test]
async fn test_empty_algorithm_set_rejected() {
    let hasher = DefaultHashProvider::new("/nonexistent");
    let middleware = middleware(RouteTable::builder().global(CspOperation::enable("main")).build());
    let mut csp = middleware.begin(None, &parts()).unwrap().unwrap();

    let err = inline_style_hashes(
        &hasher,
        &mut csp,
        "index:style",
        "body { color: red; }",
        Some(HashAlgorithms::empty()),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SecurityError::Csp(ref e) if e.is_invalid_argument()));

    let err = subresource_integrity(
        &hasher,
        &mut csp,
        InlineKind::Style,
        "/css/site.css",
        Some(HashAlgorithms::empty()),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SecurityError::Csp(_)));

    assert!(csp.main_policy().unwrap().directive("style-src").is_none());
    assert!(!csp.headers()[0].value.contains("style-src"));
}

#[tokio::test]
async fn test_inline_script_hashes_normalise_line_endings() {
    let hasher = DefaultHashProvider::new("/nonexistent");
    let middleware = middleware(RouteTable::builder().global(CspOperation::enable("main")).build());
    let mut csp = middleware.begin(None, &parts()).unwrap().unwrap();

    let hashes = inline_script_hashes(
        &hasher,
        &mut csp,
        "index:1",
        "alert(1);\r\nalert(2);",
        Some(HashAlgorithms::SHA256),
    )
    .await
    .unwrap();

    assert_eq!(hashes, vec![ALERTS_SHA256]);
    assert_eq!(
        csp.main_policy().unwrap().directive("script-src").unwrap().value(),
        format!("'{}'", ALERTS_SHA256)
    );
}

#[tokio::test]
async fn test_fallback_script_hashes() {
    let hasher = DefaultHashProvider::new("/nonexistent");
    let middleware = middleware(RouteTable::builder().global(CspOperation::enable("main")).build());
    let mut csp = middleware.begin(None, &parts()).unwrap().unwrap();

    let markup = "<script src=\"https://cdn.example.org/lib.js\"></script>\n<script>alert(1);\nalert(2);</script>";
    let hashes = fallback_script_hashes(&hasher, &mut csp, "layout:fallback", markup)
        .await
        .unwrap();
    assert_eq!(hashes, Some(vec![ALERTS_SHA256.to_string()]));

    let none = fallback_script_hashes(&hasher, &mut csp, "layout:none", "<p>no scripts</p>")
        .await
        .unwrap();
    assert!(none.is_none());
}

#[test]
fn test_parse_violation_report() {
    let body = br#"{"csp-report": {"document-uri": "https://example.org/", "violated-directive": "script-src 'none'", "blocked-uri": "inline", "line-number": 3}}"#;
    let report = parse_report(body).unwrap();

    assert_eq!(report.blocked_uri.as_deref(), Some("inline"));
    assert_eq!(report.line_number, Some(3));
    assert_eq!(report.directive(), Some("script-src 'none'"));
}
