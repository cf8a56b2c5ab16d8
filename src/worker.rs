//! Loaded-index state and the background rebuild worker.
//!
//! Parsed indices are kept in an LRU cache keyed by path and invalidated when
//! the file's modification time changes. Concurrent requests for the same
//! file share one in-flight load.

use crate::build::{self, BuildReport};
use crate::config::Config;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use crate::search::SearchIndex;

/// Maximum number of parsed indices to keep in memory.
const LRU_CACHE_SIZE: NonZeroUsize = NonZeroUsize::new(8).unwrap();

/// Default interval between background rebuilds.
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(5);

/// Type alias for shared index load futures.
type SharedIndexFuture = Shared<BoxFuture<'static, Result<Arc<SearchIndex>, String>>>;

struct CachedIndex {
    modified: Option<SystemTime>,
    index: Arc<SearchIndex>,
}

/// Shared state for loaded indices and rebuilds.
pub struct IndexState {
    /// LRU cache of parsed indices
    cache: RwLock<LruCache<PathBuf, CachedIndex>>,

    /// In-flight loads (can be awaited by multiple callers)
    in_flight: Mutex<HashMap<PathBuf, SharedIndexFuture>>,

    /// Serializes builds so two rebuilds never write the same index
    build_lock: Mutex<()>,
}

impl std::fmt::Debug for IndexState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexState")
            .field("cache_size", &self.cache.try_read().map(|c| c.len()).ok())
            .field("in_flight_count", &self.in_flight.try_lock().map(|m| m.len()).ok())
            .finish()
    }
}

impl Default for IndexState {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexState {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(LruCache::new(LRU_CACHE_SIZE)),
            in_flight: Mutex::new(HashMap::new()),
            build_lock: Mutex::new(()),
        }
    }

    /// Get the index at `path`, loading it if it is not cached or changed on disk.
    ///
    /// This is the main entry point for tool handlers. It:
    /// 1. Checks the LRU cache (hit only when the mtime is unchanged)
    /// 2. Joins an in-flight load, or registers a new one under the same lock
    pub async fn get_index(&self, path: &Path) -> Result<Arc<SearchIndex>, String> {
        let modified = modified_time(path).await;

        {
            let mut cache = self.cache.write().await;
            if let Some(cached) = cache.get(path) {
                if cached.modified == modified {
                    tracing::debug!("Cache hit for {}", path.display());
                    return Ok(cached.index.clone());
                }
                tracing::debug!("{} changed on disk, reloading", path.display());
                cache.pop(path);
            }
        }

        let (shared_future, leader) = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.get(path) {
                Some(future) => (future.clone(), false),
                None => {
                    let future = load_future(path.to_path_buf());
                    in_flight.insert(path.to_path_buf(), future.clone());
                    (future, true)
                }
            }
        };
        if !leader {
            tracing::debug!("Awaiting in-flight load of {}", path.display());
            return shared_future.await;
        }

        tracing::info!("Loading index {}", path.display());
        let result = shared_future.await;

        self.in_flight.lock().await.remove(path);

        if let Ok(ref index) = result {
            self.cache.write().await.put(
                path.to_path_buf(),
                CachedIndex {
                    modified,
                    index: index.clone(),
                },
            );
        }
        result
    }

    /// Drops the cached index for `path`.
    pub async fn invalidate(&self, path: &Path) {
        self.cache.write().await.pop(path);
    }

    /// Check if an index is cached for `path`.
    pub async fn is_cached(&self, path: &Path) -> bool {
        self.cache.read().await.contains(path)
    }

    /// Runs an incremental build and invalidates the cached index when it changed.
    pub async fn rebuild(&self, config: &Config) -> crate::error::Result<BuildReport> {
        let _guard = self.build_lock.lock().await;
        let report = build::build(config, false).await?;
        if report.changed() {
            self.invalidate(&report.index_path).await;
        }
        Ok(report)
    }
}

fn load_future(path: PathBuf) -> SharedIndexFuture {
    let future: BoxFuture<'static, Result<Arc<SearchIndex>, String>> = Box::pin(async move {
        let index = build::read_index(&path)
            .await
            .map_err(|e| format!("{:#}", e))?;
        let problems = index.validate();
        if !problems.is_empty() {
            tracing::warn!(
                "{} violates {} index invariants; results may be incomplete",
                path.display(),
                problems.len()
            );
        }
        Ok(Arc::new(index))
    });
    future.shared()
}

async fn modified_time(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}

/// Background worker that rebuilds the index whenever sources change.
pub struct BackgroundWorker {
    config: Config,
    state: Arc<IndexState>,
    period: Duration,
}

impl BackgroundWorker {
    pub fn new(config: Config, state: Arc<IndexState>, period: Duration) -> Self {
        Self {
            config,
            state,
            period,
        }
    }

    /// Run the rebuild loop until `cancel` fires. The first rebuild happens immediately.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!("Background worker stopped");
                    return;
                }
                _ = ticker.tick() => self.rebuild_once().await,
            }
        }
    }

    /// Perform one rebuild cycle.
    async fn rebuild_once(&self) {
        match self.state.rebuild(&self.config).await {
            Ok(report) if report.changed() => {
                tracing::info!(
                    "Background rebuild updated {} ({} parsed, {} removed)",
                    report.index_path.display(),
                    report.parsed,
                    report.removed
                );
            }
            Ok(_) => tracing::trace!("Background rebuild found no changes"),
            Err(e) => tracing::warn!("Background rebuild failed: {:#}", e),
        }
    }
}

/// Spawn the background worker as a tokio task.
///
/// The task ends once `cancel` is cancelled.
pub fn spawn_background_worker(
    config: Config,
    state: Arc<IndexState>,
    period: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        BackgroundWorker::new(config, state, period).run(cancel).await;
    })
}
