//! Static documentation search indices: build them from sources, read them
//! back, and answer queries with the ranking of the consuming search page.

pub mod build;
pub mod cache;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod format;
pub mod jsdump;
pub mod search;
pub mod server;
pub mod tools;
pub mod tracing;
pub mod worker;

pub use build::{BuildReport, build};
pub use config::Config;
pub use error::{ConfigError, IndexError, JsParseError, Result};
pub use search::{IndexBuilder, Language, Scorer, SearchIndex, SearchResponse, SearchResult, Searcher};
