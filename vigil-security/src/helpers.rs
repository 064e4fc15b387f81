//! Markup helpers that feed hashes into the request's main policy.
//!
//! These cover what templates need: hashing inline `<script>` / `<style>`
//! bodies, computing `integrity` attributes for subresources, and allowing the
//! inline fallback script a CDN loader emits.

use crate::context::{InlineKind, RequestCsp};
use crate::error::SecurityResult;
use crate::hash_provider::HashProvider;
use tracing::trace;
use vigil_csp::{CspError, HashAlgorithms, Policy};

const SCRIPT_OPEN: &str = "<script>";
const SCRIPT_CLOSE: &str = "</script>";

/// Hash inline content and allow it in `script-src` or `style-src`.
///
/// Without explicit `algorithms` the main policy's default hash algorithms
/// are used. Line endings are normalised to `\n` before hashing. Returns the
/// prefixed hashes, or nothing if the request has no active policy. An empty
/// algorithm set is rejected.
pub async fn inline_hashes<H>(
    provider: &H,
    csp: &mut RequestCsp,
    kind: InlineKind,
    key: &str,
    content: &str,
    algorithms: Option<HashAlgorithms>,
) -> SecurityResult<Vec<String>>
where
    H: HashProvider + ?Sized,
{
    let Some(algorithms) = algorithms.or_else(|| csp.main_policy().map(Policy::default_hash_algorithms))
    else {
        return Ok(Vec::new());
    };
    require_algorithms(algorithms)?;

    let content = content.replace("\r\n", "\n");
    let hashes = provider.content_hashes(key, &content, algorithms).await?;
    csp.add_hashes(kind, &hashes)?;

    trace!(key = %key, kind = ?kind, hashes = hashes.len(), "Allowed inline content by hash");
    Ok(hashes)
}

/// [`inline_hashes`] for an inline `<script>`.
pub async fn inline_script_hashes<H>(
    provider: &H,
    csp: &mut RequestCsp,
    key: &str,
    content: &str,
    algorithms: Option<HashAlgorithms>,
) -> SecurityResult<Vec<String>>
where
    H: HashProvider + ?Sized,
{
    inline_hashes(provider, csp, InlineKind::Script, key, content, algorithms).await
}

/// [`inline_hashes`] for an inline `<style>`.
pub async fn inline_style_hashes<H>(
    provider: &H,
    csp: &mut RequestCsp,
    key: &str,
    content: &str,
    algorithms: Option<HashAlgorithms>,
) -> SecurityResult<Vec<String>>
where
    H: HashProvider + ?Sized,
{
    inline_hashes(provider, csp, InlineKind::Style, key, content, algorithms).await
}

/// Compute the `integrity` attribute for a local subresource.
///
/// The hashes are also allowed in `script-src` (scripts) or `style-src`
/// (stylesheets) of the main policy. Put `crossorigin="anonymous"` next to the
/// attribute.
pub async fn subresource_integrity<H>(
    provider: &H,
    csp: &mut RequestCsp,
    kind: InlineKind,
    path: &str,
    algorithms: Option<HashAlgorithms>,
) -> SecurityResult<String>
where
    H: HashProvider + ?Sized,
{
    let algorithms = algorithms
        .or_else(|| csp.main_policy().map(Policy::default_hash_algorithms))
        .unwrap_or_default();
    require_algorithms(algorithms)?;

    let hashes = provider.file_hashes(path, algorithms).await?;
    csp.add_hashes(kind, &hashes)?;

    trace!(path = %path, kind = ?kind, "Computed subresource integrity");
    Ok(hashes.join(" "))
}

/// Allow the inline fallback script at the end of `markup`.
///
/// CDN loaders render a remote `<script src>` followed by an inline
/// `<script>` that loads a local copy when the remote one failed. The last
/// inline script is hashed with SHA-256 and added to `script-src`. Returns
/// `None` when `markup` has no such script.
pub async fn fallback_script_hashes<H>(
    provider: &H,
    csp: &mut RequestCsp,
    key: &str,
    markup: &str,
) -> SecurityResult<Option<Vec<String>>>
where
    H: HashProvider + ?Sized,
{
    let Some(script) = last_inline_script(markup) else {
        return Ok(None);
    };

    let hashes = provider
        .content_hashes(key, script, HashAlgorithms::SHA256)
        .await?;
    csp.add_hashes(InlineKind::Script, &hashes)?;
    Ok(Some(hashes))
}

fn require_algorithms(algorithms: HashAlgorithms) -> SecurityResult<()> {
    if algorithms.is_empty() {
        return Err(
            CspError::invalid_argument("algorithms", "at least one hash algorithm is required")
                .into(),
        );
    }
    Ok(())
}

fn last_inline_script(markup: &str) -> Option<&str> {
    let start = markup.rfind(SCRIPT_OPEN)? + SCRIPT_OPEN.len();
    let end = markup.rfind(SCRIPT_CLOSE)?;
    markup.get(start..end)
}
