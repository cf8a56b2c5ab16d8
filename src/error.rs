//! Error handling types and utilities.

use std::path::PathBuf;
use thiserror::Error;

/// A specialized Result type for docsearch operations.
///
/// This is an alias for `anyhow::Result` with context added via `.context()` and
/// `.with_context()` methods at the application edges (build, CLI, tools).
pub type Result<T> = anyhow::Result<T>;

/// Problems found in a search index payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// The payload is not wrapped in `Search.setIndex(...)`.
    #[error("payload is not a Search.setIndex(...) call")]
    MissingWrapper,

    /// The payload could not be parsed as a JS object literal.
    #[error(transparent)]
    Syntax(#[from] JsParseError),

    /// The payload parsed but does not have the expected shape.
    #[error("malformed index payload: {0}")]
    Shape(String),

    /// The index was produced by a different producer version.
    #[error("index format version mismatch (found {found}, expected {expected})")]
    VersionMismatch { found: String, expected: String },

    /// `docnames`, `filenames` and `titles` disagree in length.
    #[error("parallel arrays differ in length: {docnames} docnames, {filenames} filenames, {titles} titles")]
    LengthMismatch {
        docnames: usize,
        filenames: usize,
        titles: usize,
    },

    /// `docnames` is not strictly ascending.
    #[error("docnames are not sorted and unique at position {0}")]
    UnsortedDocnames(usize),

    /// A table references a document index past the end of `docnames`.
    #[error("{table} entry '{key}' references document {index}, but only {len} documents exist")]
    DocumentOutOfRange {
        table: &'static str,
        key: String,
        index: usize,
        len: usize,
    },

    /// A document set is empty or not strictly ascending.
    #[error("{table} entry '{key}' has an invalid document set")]
    InvalidDocSet { table: &'static str, key: String },

    /// An object references a type index missing from `objtypes`/`objnames`.
    #[error("object '{name}' references unknown type index {typeindex}")]
    UnknownObjectType { name: String, typeindex: usize },

    /// `objtypes` and `objnames` disagree for a type index.
    #[error("objtypes and objnames disagree for type index {0}")]
    ObjectTypeMismatch(usize),

    /// Object priority outside of `0..=2`.
    #[error("object '{name}' has invalid priority {priority}")]
    InvalidPriority { name: String, priority: i32 },
}

/// Syntax error in the JS object-literal dialect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct JsParseError {
    pub message: String,
    pub offset: usize,
}

impl JsParseError {
    pub(crate) fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Error returned when loading project configuration fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// No stemmer exists for the configured language.
    #[error("unsupported search language '{0}'")]
    UnsupportedLanguage(String),

    /// An exclude pattern is not a valid glob.
    #[error("invalid exclude pattern '{pattern}': {message}")]
    InvalidExclude { pattern: String, message: String },
}
