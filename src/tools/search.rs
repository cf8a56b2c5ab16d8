//! Full-text and object search handler.

use crate::format::format_search_response;
use crate::search::Searcher;
use crate::server::ServerContext;
use rmcp::schemars;
use serde::Deserialize;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchRequest {
    /// Search query. Words prefixed with '-' exclude pages containing them.
    pub query: String,
    /// Maximum number of results to return (default: 10)
    #[serde(default = "default_limit")]
    pub limit: Option<usize>,
    /// Index file to search instead of the configured one
    #[serde(default)]
    pub index: Option<String>,
}

fn default_limit() -> Option<usize> {
    Some(10)
}

/// Execute a query against the requested index.
pub async fn handle_search(context: &ServerContext, request: SearchRequest) -> Result<String, String> {
    if request.query.trim().is_empty() {
        return Err("Query must not be empty".to_string());
    }

    let index = context.index(request.index.as_deref()).await?;
    let limit = request.limit.unwrap_or(10);
    let searcher = Searcher::new(&index, context.language(), &context.config().scorer);
    let response = searcher.search(&request.query, limit);

    Ok(format_search_response(&response))
}
