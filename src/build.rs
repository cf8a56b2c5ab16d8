//! Project builds: discover sources, update the index, write it out.
//!
//! Builds are incremental by default. The previous index and build cache are
//! loaded, documents whose sources are unchanged are carried over, removed
//! documents are pruned and only changed documents are parsed again. Any
//! problem with the previous state falls back to a full build.

use crate::cache::{BuildCache, Fingerprint, write_atomic};
use crate::config::Config;
use crate::document::{self, SourceFile};
use crate::error::Result;
use crate::jsdump;
use crate::search::{IndexBuilder, IndexStats, Language, SearchIndex};
use ahash::AHashSet;
use anyhow::Context;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Summary of a finished build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub index_path: PathBuf,
    /// Documents parsed in this build.
    pub parsed: usize,
    /// Documents carried over unchanged from the previous index.
    pub reused: usize,
    /// Documents of the previous index whose sources disappeared.
    pub removed: usize,
    pub incremental: bool,
    pub stats: IndexStats,
    pub elapsed: Duration,
}

impl BuildReport {
    /// Whether the written index differs from the previous one.
    pub fn changed(&self) -> bool {
        !self.incremental || self.parsed > 0 || self.removed > 0
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Indexed {} documents into {} ({} build, {:.2?})",
            self.stats.documents,
            self.index_path.display(),
            if self.incremental { "incremental" } else { "full" },
            self.elapsed
        )?;
        writeln!(
            f,
            "  parsed: {}, reused: {}, removed: {}",
            self.parsed, self.reused, self.removed
        )?;
        write!(
            f,
            "  terms: {}, title terms: {}, objects: {}",
            self.stats.terms, self.stats.title_terms, self.stats.objects
        )
    }
}

/// Builds the index described by `config`. `fresh` ignores any previous build state.
pub async fn build(config: &Config, fresh: bool) -> Result<BuildReport> {
    let start = Instant::now();
    let language = Language::new(&config.search.language, &config.search.extra_stopwords)?;
    let sources = discover_sources(config).await?;

    let index_path = config.index_path();
    let cache_path = BuildCache::path_for(&index_path);
    let fingerprint = config.fingerprint();

    let mut builder = IndexBuilder::new(language);
    let previous = if fresh {
        None
    } else {
        load_previous(&index_path, &cache_path, fingerprint, &mut builder).await
    };
    let incremental = previous.is_some();
    let previous = previous.unwrap_or_else(|| BuildCache::new(fingerprint));

    let keep: AHashSet<String> = sources.iter().map(|s| s.docname.clone()).collect();
    let before = builder.len();
    builder.prune(&keep);
    let mut removed = before - builder.len();

    let mut cache = BuildCache::new(fingerprint);
    let mut parsed = 0;
    let mut reused = 0;
    for source in &sources {
        let bytes = match tokio::fs::read(&source.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Skipping unreadable source {}: {}", source.path.display(), e);
                if builder.contains(&source.docname) {
                    builder.remove(&source.docname);
                    removed += 1;
                }
                continue;
            }
        };
        let source_fingerprint = Fingerprint::of(&bytes);
        cache.sources.insert(source.docname.clone(), source_fingerprint);

        if incremental
            && builder.contains(&source.docname)
            && previous.is_fresh(&source.docname, source_fingerprint)
        {
            reused += 1;
            continue;
        }

        tracing::debug!("Parsing {}", source.filename);
        builder.feed(&parse_source(source, &bytes));
        parsed += 1;
    }

    let index = builder.freeze();
    let report = BuildReport {
        index_path,
        parsed,
        reused,
        removed,
        incremental,
        stats: index.stats(),
        elapsed: start.elapsed(),
    };

    let index_exists = tokio::fs::try_exists(&report.index_path).await.unwrap_or(false);
    if report.changed() || !index_exists {
        // The cache must never describe an index other than the one on disk.
        if let Err(e) = tokio::fs::remove_file(&cache_path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            return Err(e)
                .with_context(|| format!("Failed to remove stale cache {}", cache_path.display()));
        }
        write_index(&index, config, &report.index_path).await?;
        if let Err(e) = cache.store(&cache_path).await {
            tracing::warn!("Failed to write build cache: {:#}", e);
        }
    } else {
        tracing::debug!("Index unchanged, leaving {} untouched", report.index_path.display());
    }

    tracing::info!(
        "Built index with {} documents ({} parsed, {} reused, {} removed)",
        report.stats.documents,
        parsed,
        reused,
        removed
    );
    Ok(report)
}

/// Reads and parses an index file in either format.
pub async fn read_index(path: &Path) -> Result<SearchIndex> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read index {}", path.display()))?;
    let index = tokio::task::spawn_blocking(move || jsdump::load_index(&text))
        .await
        .context("Index parsing task panicked")?
        .with_context(|| format!("Failed to parse index {}", path.display()))?;
    Ok(index)
}

async fn discover_sources(config: &Config) -> Result<Vec<SourceFile>> {
    let source_dir = config.project.source_dir.clone();
    let is_dir = tokio::fs::metadata(&source_dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        anyhow::bail!("Source directory {} does not exist", source_dir.display());
    }

    let suffixes = config.project.source_suffix.clone();
    let exclude = config.project.exclude.clone();
    let sources = tokio::task::spawn_blocking(move || {
        document::discover(&source_dir, &suffixes, &exclude)
    })
    .await
    .context("Source discovery task panicked")??;
    Ok(sources)
}

/// Restores the previous build into `builder`, or returns `None` for a full build.
async fn load_previous(
    index_path: &Path,
    cache_path: &Path,
    fingerprint: u64,
    builder: &mut IndexBuilder,
) -> Option<BuildCache> {
    let cache = BuildCache::load(cache_path).await?;
    if !cache.is_compatible(fingerprint) {
        tracing::info!("Configuration changed since the last build, rebuilding everything");
        return None;
    }

    let index = match read_index(index_path).await {
        Ok(index) => index,
        Err(e) => {
            tracing::warn!("Previous index unusable, rebuilding everything: {:#}", e);
            return None;
        }
    };
    // A failed load leaves the builder untouched.
    if let Err(e) = builder.load(&index) {
        tracing::warn!("Previous index unusable, rebuilding everything: {}", e);
        return None;
    }
    Some(cache)
}

fn parse_source(source: &SourceFile, bytes: &[u8]) -> document::SourceDocument {
    let text = String::from_utf8_lossy(bytes);
    document::parse(&source.docname, &source.filename, &text, source.format)
}

async fn write_index(index: &SearchIndex, config: &Config, path: &Path) -> Result<()> {
    let text = jsdump::dump_index(index, config.project.format)
        .context("Failed to serialize index")?;
    write_atomic(path, text.as_bytes())
        .await
        .with_context(|| format!("Failed to write index {}", path.display()))
}
