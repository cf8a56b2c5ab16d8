//! Build cache with fingerprint-based change detection.
//!
//! The cache records which configuration produced the index and a content
//! fingerprint of every source, so an incremental build only re-parses
//! documents whose bytes changed.

use crate::error::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::xxh3_64;

/// File name of the build cache, stored next to the index file.
pub const CACHE_FILE_NAME: &str = ".docsearch-cache";

/// Version of the cache layout. Caches of other versions are ignored.
pub const CACHE_VERSION: u32 = 1;

/// 64-bit content hash of a source file.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        Self(xxh3_64(bytes))
    }

    /// Returns the hash as a lowercase hexadecimal string
    pub fn as_hex(&self) -> String {
        format!("{:016x}", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hex())
    }
}

/// State persisted between builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildCache {
    pub version: u32,
    /// [`crate::config::Config::fingerprint`] of the producing configuration.
    pub config: u64,
    /// Docname → fingerprint of the source it was built from.
    pub sources: BTreeMap<String, Fingerprint>,
}

impl BuildCache {
    pub fn new(config: u64) -> Self {
        Self {
            version: CACHE_VERSION,
            config,
            sources: BTreeMap::new(),
        }
    }

    /// Cache location for an index file.
    pub fn path_for(index_path: &Path) -> PathBuf {
        index_path.with_file_name(CACHE_FILE_NAME)
    }

    /// Whether documents recorded here can be reused under `config`.
    pub fn is_compatible(&self, config: u64) -> bool {
        self.version == CACHE_VERSION && self.config == config
    }

    /// Whether `docname` was last built from content with this fingerprint.
    pub fn is_fresh(&self, docname: &str, fingerprint: Fingerprint) -> bool {
        self.sources.get(docname) == Some(&fingerprint)
    }

    /// Loads a cache, returning `None` when it is missing or unreadable.
    pub async fn load(path: &Path) -> Option<Self> {
        let bytes = tokio::fs::read(path).await.ok()?;
        match postcard::from_bytes::<Self>(&bytes) {
            Ok(cache) => {
                tracing::debug!(
                    "Loaded build cache with {} sources from {}",
                    cache.sources.len(),
                    path.display()
                );
                Some(cache)
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable build cache at {}: {}", path.display(), e);
                None
            }
        }
    }

    pub async fn store(&self, path: &Path) -> Result<()> {
        let bytes = postcard::to_allocvec(self).context("Failed to serialize build cache")?;
        write_atomic(path, &bytes).await
    }
}

/// Writes `contents` to a sibling temporary file and renames it over `path`.
///
/// Readers never observe a partially written file.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut tmp_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, contents)
        .await
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
    }
    Ok(())
}
