//! Project configuration loaded from `docsearch.toml`.
//!
//! Every field has a default, so an absent file behaves like an empty one.
//! Relative paths are resolved against the directory holding the config file.

use crate::error::ConfigError;
use crate::jsdump::IndexFormat;
use crate::search::Scorer;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::xxh3_64;

/// Default configuration file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "docsearch.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub project: ProjectConfig,
    pub search: SearchConfig,
    pub scorer: Scorer,
}

/// Where sources live and where the index goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Root of the documentation sources.
    pub source_dir: PathBuf,
    /// Directory receiving the index file and the build cache.
    pub output_dir: PathBuf,
    /// Name of the index file inside `output_dir`.
    pub index_file: String,
    /// Source suffixes to index, without the leading dot.
    pub source_suffix: Vec<String>,
    /// Glob patterns (relative to `source_dir`) of sources to skip.
    pub exclude: Vec<String>,
    pub format: IndexFormat,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("docs"),
            output_dir: PathBuf::from("_build/html"),
            index_file: "searchindex.js".to_string(),
            source_suffix: vec!["rst".to_string(), "md".to_string(), "txt".to_string()],
            exclude: vec!["_build/**".to_string()],
            format: IndexFormat::Js,
        }
    }
}

/// Tokenization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Snowball language code (`en`, `de`, `fr`, ...).
    pub language: String,
    /// Stopwords added to the language's built-in list.
    pub extra_stopwords: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            extra_stopwords: Vec::new(),
        }
    }
}

impl Config {
    /// Reads and parses a configuration file, resolving its relative paths.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(base) = path.parent() {
            config.project.resolve_paths(base);
        }
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Loads `path` when given, otherwise `docsearch.toml` in the working
    /// directory if present, otherwise defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(&expand_path(path));
        }
        let default_path = Path::new(CONFIG_FILE_NAME);
        if default_path.is_file() {
            Self::load(default_path)
        } else {
            tracing::debug!("No {} found, using defaults", CONFIG_FILE_NAME);
            Ok(Self::default())
        }
    }

    /// Parses configuration text without resolving paths.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Full path of the index file.
    pub fn index_path(&self) -> PathBuf {
        self.project.output_dir.join(&self.project.index_file)
    }

    /// Fingerprint of every setting that influences index contents.
    ///
    /// Scorer weights only affect querying and are excluded.
    pub fn fingerprint(&self) -> u64 {
        let mut suffixes = self.project.source_suffix.clone();
        suffixes.sort();
        let mut stopwords = self.search.extra_stopwords.clone();
        stopwords.sort();
        let key = format!(
            "{}\u{0}{}\u{0}{}\u{0}{:?}",
            self.search.language,
            suffixes.join(","),
            stopwords.join(","),
            self.project.format
        );
        xxh3_64(key.as_bytes())
    }
}

impl ProjectConfig {
    fn resolve_paths(&mut self, base: &Path) {
        self.source_dir = resolve(base, &self.source_dir);
        self.output_dir = resolve(base, &self.output_dir);
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    let path = expand_path(path);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Expands a leading tilde (`~`) to the user's home directory.
pub fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(expand_tilde(s).into_owned()),
        None => path.to_path_buf(),
    }
}

/// Expands tilde (`~`) in a path to the user's home directory.
///
/// - `~/foo` becomes `/home/user/foo`
/// - `~` becomes `/home/user`
/// - Other paths are returned unchanged
pub fn expand_tilde(path: &str) -> Cow<'_, str> {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return Cow::Owned(home.join(stripped).display().to_string());
        }
    } else if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return Cow::Owned(home.display().to_string());
    }
    Cow::Borrowed(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};

    #[test]
    fn empty_config_uses_defaults() {
        let_assert!(Ok(config) = Config::parse(""));
        check!(config == Config::default());
        check!(config.index_path() == PathBuf::from("_build/html/searchindex.js"));
    }

    #[test]
    fn parses_all_sections() {
        let text = r#"
[project]
source_dir = "doc"
output_dir = "out"
format = "json"
source_suffix = ["rst"]

[search]
language = "de"
extra_stopwords = ["und"]

[scorer]
title = 20
"#;
        let_assert!(Ok(config) = Config::parse(text));
        check!(config.project.source_dir == PathBuf::from("doc"));
        check!(config.project.format == IndexFormat::Json);
        check!(config.search.language == "de");
        check!(config.search.extra_stopwords == vec!["und".to_string()]);
        check!(config.scorer.title == 20);
        check!(config.scorer.term == Scorer::default().term);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        check!(Config::parse("[project]\nsrc = \"x\"").is_err());
    }

    #[test]
    fn fingerprint_ignores_scorer_and_ordering() {
        let mut a = Config::default();
        let mut b = Config::default();
        b.scorer.title = 99;
        b.project.source_suffix.reverse();
        check!(a.fingerprint() == b.fingerprint());

        a.search.language = "fr".to_string();
        check!(a.fingerprint() != b.fingerprint());

        let mut c = Config::default();
        c.project.format = IndexFormat::Json;
        check!(c.fingerprint() != Config::default().fingerprint());
    }

    #[test]
    fn load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[project]\nsource_dir = \"src-docs\"\n").unwrap();

        let_assert!(Ok(config) = Config::load(&path));
        check!(config.project.source_dir == dir.path().join("src-docs"));
        check!(config.project.output_dir == dir.path().join("_build/html"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let result = Config::load(Path::new("/nonexistent/docsearch.toml"));
        check!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
