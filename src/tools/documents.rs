//! Document listing handler.

use crate::format::format_documents;
use crate::server::ServerContext;
use rmcp::schemars;
use serde::Deserialize;

/// Parameters for list_documents tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListDocumentsRequest {
    /// Index file to list instead of the configured one
    #[serde(default)]
    pub index: Option<String>,
}

/// List every document in the index with its title and source file.
pub async fn handle_list_documents(
    context: &ServerContext,
    request: ListDocumentsRequest,
) -> Result<String, String> {
    let index = context.index(request.index.as_deref()).await?;
    Ok(format_documents(&index))
}
