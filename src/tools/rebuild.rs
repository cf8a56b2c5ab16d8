//! Rebuild handler.

use crate::server::ServerContext;
use rmcp::schemars;
use serde::Deserialize;

/// Parameters for rebuild tool
#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct RebuildRequest {}

/// Incrementally rebuild the configured index from its sources.
pub async fn handle_rebuild(context: &ServerContext, _request: RebuildRequest) -> Result<String, String> {
    let report = context
        .state()
        .rebuild(context.config())
        .await
        .map_err(|e| format!("Rebuild failed: {:#}", e))?;
    Ok(report.to_string())
}
