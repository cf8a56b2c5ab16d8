//! Shared test fixtures and utilities for integration tests.
//!
//! # Test Isolation Strategy
//!
//! Every test builds into its own temporary directory. A [`DocsProject`] copies
//! the sources under `tests/fixtures/docs` into a fresh workspace and points a
//! [`Config`] at it, so no test ever sees another test's index or build cache.
//!
//! # Available Fixtures
//!
//! - `docs_project`: the fixture documentation, not built yet
//! - `built_project`: the same project after one full build

use docsearch::Config;
use docsearch::search::SearchIndex;
use docsearch::server::ServerContext;
use docsearch::worker::IndexState;
use rstest::fixture;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Returns the project root directory (where Cargo.toml lives).
pub fn project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Directory holding the fixture documentation sources.
pub fn fixture_docs() -> PathBuf {
    project_root().join("tests/fixtures/docs")
}

/// A temporary workspace directory for test isolation.
///
/// Provides basic filesystem operations within a temp directory that is
/// automatically cleaned up when dropped.
#[allow(dead_code)] // Methods used across different integration test crates
pub struct TempWorkspace {
    _temp: TempDir,
    root: PathBuf,
}

#[allow(dead_code)] // Methods used across different integration test crates
impl TempWorkspace {
    /// Creates a new empty temporary workspace.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().to_path_buf();
        Self { _temp: temp, root }
    }

    /// Returns the root path of this workspace.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Creates a file with the given content within this workspace.
    ///
    /// Parent directories are created automatically if they don't exist.
    ///
    /// # Panics
    /// Panics if file creation fails.
    pub fn create_file(&self, path: &str, content: &str) {
        let full_path = self.root.join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap_or_else(|e| {
                panic!("Failed to create parent directory for '{}': {}", path, e)
            });
        }
        std::fs::write(&full_path, content)
            .unwrap_or_else(|e| panic!("Failed to write file '{}': {}", path, e));
    }

    /// Removes a file within this workspace.
    pub fn remove_file(&self, path: &str) {
        std::fs::remove_file(self.root.join(path))
            .unwrap_or_else(|e| panic!("Failed to remove file '{}': {}", path, e));
    }

    /// Recursively copies a directory from the real filesystem into this workspace.
    pub fn copy_dir(&self, source: &Path, dest_relative: &str) {
        let dest = self.root.join(dest_relative);
        copy_tree(source, &dest).unwrap_or_else(|e| {
            panic!(
                "Failed to copy '{}' to '{}': {}",
                source.display(),
                dest_relative,
                e
            )
        });
    }
}

impl Default for TempWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

fn copy_tree(source: &Path, dest: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// A copy of the fixture documentation with a configuration pointing at it.
#[allow(dead_code)] // Fields used across different integration test crates
pub struct DocsProject {
    pub workspace: TempWorkspace,
    pub config: Config,
}

#[allow(dead_code)] // Methods used across different integration test crates
impl DocsProject {
    pub fn new() -> Self {
        let workspace = TempWorkspace::new();
        workspace.copy_dir(&fixture_docs(), "docs");

        let mut config = Config::default();
        config.project.source_dir = workspace.path().join("docs");
        config.project.output_dir = workspace.path().join("out");
        Self { workspace, config }
    }

    /// Writes `docs/<path>` inside the project.
    pub fn write_source(&self, path: &str, content: &str) {
        self.workspace.create_file(&format!("docs/{}", path), content);
    }

    pub fn remove_source(&self, path: &str) {
        self.workspace.remove_file(&format!("docs/{}", path));
    }

    pub fn index_path(&self) -> PathBuf {
        self.config.index_path()
    }

    pub fn index_text(&self) -> String {
        std::fs::read_to_string(self.index_path()).expect("Failed to read index")
    }

    pub async fn build(&self) -> docsearch::BuildReport {
        docsearch::build(&self.config, false)
            .await
            .expect("Build should succeed")
    }

    pub async fn build_fresh(&self) -> docsearch::BuildReport {
        docsearch::build(&self.config, true)
            .await
            .expect("Fresh build should succeed")
    }

    pub async fn read_index(&self) -> SearchIndex {
        docsearch::build::read_index(&self.index_path())
            .await
            .expect("Index should parse")
    }

    /// A server context serving this project's index.
    pub fn context(&self) -> ServerContext {
        ServerContext::new(self.config.clone(), None, Arc::new(IndexState::new()))
            .expect("Default language is supported")
    }
}

impl Default for DocsProject {
    fn default() -> Self {
        Self::new()
    }
}

/// The fixture documentation, not built yet.
#[fixture]
pub fn docs_project() -> DocsProject {
    DocsProject::new()
}

/// The fixture documentation after one full build.
#[fixture]
pub fn built_project() -> DocsProject {
    let project = DocsProject::new();
    tokio::task::block_in_place(|| {
        tokio::runtime::Handle::current().block_on(async {
            project.build().await;
        });
    });
    project
}
