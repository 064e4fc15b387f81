//! Content and file hashing for CSP hash sources and Subresource Integrity.
//!
//! Hashes are returned as `sha256-<base64>` style strings, one per requested
//! algorithm, ordered from the weakest to the strongest algorithm. Results are
//! memoized for the lifetime of the provider. File hashes are recomputed when
//! the file's modification time or length changes.

use crate::error::{SecurityError, SecurityResult};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use dashmap::DashMap;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fs::Metadata;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, trace, warn};
use vigil_csp::HashAlgorithms;

/// Computes hash source expressions.
#[async_trait]
pub trait HashProvider: Send + Sync {
    /// Hash inline content. `key` identifies the content for caching.
    async fn content_hashes(
        &self,
        key: &str,
        content: &str,
        algorithms: HashAlgorithms,
    ) -> SecurityResult<Vec<String>>;

    /// Hash a file addressed by its request path, e.g. `/js/site.js`.
    async fn file_hashes(&self, path: &str, algorithms: HashAlgorithms)
    -> SecurityResult<Vec<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl From<&Metadata> for FileStamp {
    fn from(metadata: &Metadata) -> Self {
        Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        }
    }
}

#[derive(Debug, Clone)]
struct FileEntry {
    stamp: FileStamp,
    hashes: Vec<String>,
}

/// Hashes files below a web root with an in-memory cache.
#[derive(Debug)]
pub struct DefaultHashProvider {
    web_root: PathBuf,
    path_base: Option<String>,
    content_cache: DashMap<(String, HashAlgorithms), Vec<String>>,
    file_cache: DashMap<(PathBuf, HashAlgorithms), FileEntry>,
}

impl DefaultHashProvider {
    /// Create a provider serving files from `web_root`.
    pub fn new(web_root: impl Into<PathBuf>) -> Self {
        let web_root = web_root.into();
        debug!(web_root = %web_root.display(), "Creating hash provider");
        Self {
            web_root,
            path_base: None,
            content_cache: DashMap::new(),
            file_cache: DashMap::new(),
        }
    }

    /// Application mount prefix, e.g. `/app`.
    ///
    /// A path that does not exist as given is retried with this prefix removed.
    pub fn with_path_base(mut self, path_base: impl Into<String>) -> Self {
        let path_base = path_base.into();
        let trimmed = path_base.trim_end_matches('/');
        self.path_base = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn web_root(&self) -> &Path {
        &self.web_root
    }

    /// Drop cached hashes of one file.
    pub fn invalidate(&self, path: &str) {
        if let Ok(full) = self.resolve(path) {
            self.file_cache.retain(|(cached, _), _| cached != &full);
            trace!(path = %path, "Invalidated cached file hashes");
        }
    }

    /// Drop every cached hash.
    pub fn clear(&self) {
        self.content_cache.clear();
        self.file_cache.clear();
    }

    /// Number of cached content and file entries.
    pub fn cached_entries(&self) -> usize {
        self.content_cache.len() + self.file_cache.len()
    }

    fn resolve(&self, request_path: &str) -> SecurityResult<PathBuf> {
        let relative = request_path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_start_matches('/');
        if relative.is_empty() {
            return Err(SecurityError::InvalidPath(request_path.to_string()));
        }

        let relative = Path::new(relative);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(SecurityError::InvalidPath(request_path.to_string()));
        }

        Ok(self.web_root.join(relative))
    }

    fn candidates<'a>(&self, request_path: &'a str) -> Vec<&'a str> {
        let mut candidates = vec![request_path];
        if let Some(base) = &self.path_base {
            let stripped = request_path
                .get(..base.len())
                .filter(|prefix| prefix.eq_ignore_ascii_case(base))
                .and_then(|_| request_path.get(base.len()..));
            if let Some(stripped) = stripped.filter(|s| s.starts_with('/')) {
                candidates.push(stripped);
            }
        }
        candidates
    }

    async fn hash_file(
        &self,
        full: PathBuf,
        stamp: FileStamp,
        algorithms: HashAlgorithms,
    ) -> SecurityResult<Vec<String>> {
        let key = (full, algorithms);
        let cached = self
            .file_cache
            .get(&key)
            .filter(|entry| entry.stamp == stamp)
            .map(|entry| entry.hashes.clone());
        if let Some(hashes) = cached {
            trace!(path = %key.0.display(), "File hash cache hit");
            return Ok(hashes);
        }

        let bytes = tokio::fs::read(&key.0).await?;
        let hashes = compute_hashes(&bytes, algorithms);
        debug!(
            path = %key.0.display(),
            algorithms = %algorithms,
            bytes = bytes.len(),
            "Hashed file"
        );

        self.file_cache.insert(
            key,
            FileEntry {
                stamp,
                hashes: hashes.clone(),
            },
        );
        Ok(hashes)
    }
}

#[async_trait]
impl HashProvider for DefaultHashProvider {
    async fn content_hashes(
        &self,
        key: &str,
        content: &str,
        algorithms: HashAlgorithms,
    ) -> SecurityResult<Vec<String>> {
        let hashes = self
            .content_cache
            .entry((key.to_string(), algorithms))
            .or_insert_with(|| {
                trace!(key = %key, algorithms = %algorithms, "Hashing inline content");
                compute_hashes(content.as_bytes(), algorithms)
            })
            .clone();
        Ok(hashes)
    }

    async fn file_hashes(
        &self,
        path: &str,
        algorithms: HashAlgorithms,
    ) -> SecurityResult<Vec<String>> {
        for candidate in self.candidates(path) {
            let full = self.resolve(candidate)?;
            match tokio::fs::metadata(&full).await {
                Ok(metadata) if metadata.is_file() => {
                    let stamp = FileStamp::from(&metadata);
                    return self.hash_file(full, stamp, algorithms).await;
                }
                Ok(_) => continue,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            }
        }

        warn!(path = %path, web_root = %self.web_root.display(), "File to hash not found");
        Err(SecurityError::FileNotFound(PathBuf::from(path)))
    }
}

/// Hash `bytes` with every algorithm in `algorithms`.
pub fn compute_hashes(bytes: &[u8], algorithms: HashAlgorithms) -> Vec<String> {
    algorithms
        .iter()
        .filter_map(|algorithm| {
            let digest = if algorithm == HashAlgorithms::SHA256 {
                STANDARD.encode(Sha256::digest(bytes))
            } else if algorithm == HashAlgorithms::SHA384 {
                STANDARD.encode(Sha384::digest(bytes))
            } else if algorithm == HashAlgorithms::SHA512 {
                STANDARD.encode(Sha512::digest(bytes))
            } else {
                return None;
            };
            algorithm.prefix().map(|prefix| format!("{}{}", prefix, digest))
        })
        .collect()
}
