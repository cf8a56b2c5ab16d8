//! Full-text search over documentation sources.
//!
//! Documents are fed into an [`IndexBuilder`], frozen into a [`SearchIndex`]
//! and queried through a [`Searcher`]. Tokenization is shared between the
//! builder and the query parser through [`Language`].

pub(crate) mod builder;
pub(crate) mod index;
pub(crate) mod query;
pub(crate) mod scoring;
pub(crate) mod searcher;
pub(crate) mod tokenize;

pub use builder::{FORMAT_VERSION, IndexBuilder, PRODUCER, object_type_label};
pub use index::{
    DocSet, DocumentRef, IndexStats, ObjectEntry, ObjectName, ObjectRef, ObjectTable, SearchIndex,
};
pub use query::ParsedQuery;
pub use scoring::Scorer;
pub use searcher::{SearchResponse, SearchResult, Searcher};
pub use tokenize::Language;
