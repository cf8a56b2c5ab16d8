//! MCP server implementation and session state.

use crate::config::{Config, expand_tilde};
use crate::error::ConfigError;
use crate::search::{Language, SearchIndex};
use crate::tools::documents::{ListDocumentsRequest, handle_list_documents};
use crate::tools::rebuild::{RebuildRequest, handle_rebuild};
use crate::tools::search::{SearchRequest, handle_search};
use crate::worker::IndexState;
use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars::{self, JsonSchema, generate::SchemaSettings},
    tool, tool_handler, tool_router,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a tool handler needs: configuration, tokenization and loaded indices.
#[derive(Debug)]
pub struct ServerContext {
    config: Config,
    language: Language,
    index_path: PathBuf,
    state: Arc<IndexState>,
}

impl ServerContext {
    /// `index_path` overrides the index file named by the configuration.
    pub fn new(
        config: Config,
        index_path: Option<PathBuf>,
        state: Arc<IndexState>,
    ) -> Result<Self, ConfigError> {
        let language = Language::new(&config.search.language, &config.search.extra_stopwords)?;
        let index_path = index_path.unwrap_or_else(|| config.index_path());
        Ok(Self {
            config,
            language,
            index_path,
            state,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn state(&self) -> &Arc<IndexState> {
        &self.state
    }

    /// Default index file served by the tools.
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// The requested index file, or the default one.
    pub fn resolve_index(&self, requested: Option<&str>) -> PathBuf {
        match requested {
            Some(path) if !path.trim().is_empty() => PathBuf::from(expand_tilde(path.trim()).as_ref()),
            _ => self.index_path.clone(),
        }
    }

    /// Loads (or reuses) the requested index.
    pub async fn index(&self, requested: Option<&str>) -> Result<Arc<SearchIndex>, String> {
        let path = self.resolve_index(requested);
        self.state.get_index(&path).await.map_err(|e| {
            format!(
                "{}\n\nBuild the index first with `docsearch build` or the rebuild tool.",
                e
            )
        })
    }
}

/// MCP Server for documentation search
#[derive(Clone)]
pub struct IndexServer {
    /// Shared context (configuration, language, index cache)
    context: Arc<ServerContext>,

    /// Tool router for handling MCP tool calls
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for IndexServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexServer")
            .field("context", &self.context)
            .finish()
    }
}

#[tool_router]
impl IndexServer {
    pub fn new(context: Arc<ServerContext>) -> Self {
        Self {
            context,
            tool_router: Self::tool_router(),
        }
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.context
    }

    #[tool(
        description = "Search the documentation index. Matches described objects (modules, classes, functions) by name and pages by their words, returning results ranked by relevance. Prefix a word with '-' to exclude pages containing it.",
        input_schema = inline_schema_for_type::<SearchRequest>()
    )]
    async fn search(
        &self,
        Parameters(request): Parameters<SearchRequest>,
    ) -> std::result::Result<String, String> {
        handle_search(&self.context, request).await
    }

    #[tool(
        description = "List every document in the documentation index with its title and source file.",
        input_schema = inline_schema_for_type::<ListDocumentsRequest>()
    )]
    async fn list_documents(
        &self,
        Parameters(request): Parameters<ListDocumentsRequest>,
    ) -> std::result::Result<String, String> {
        handle_list_documents(&self.context, request).await
    }

    #[tool(
        description = "Rebuild the documentation index from its sources. Only changed documents are parsed again.",
        input_schema = inline_schema_for_type::<RebuildRequest>()
    )]
    async fn rebuild(
        &self,
        Parameters(request): Parameters<RebuildRequest>,
    ) -> std::result::Result<String, String> {
        handle_rebuild(&self.context, request).await
    }
}

#[tool_handler]
impl ServerHandler for IndexServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_protocol_version(ProtocolVersion::V_2024_11_05)
            .with_server_info(Implementation::from_build_env())
            .with_instructions(format!(
                "docsearch: full-text search over a documentation site's search index ({}). \
                 Use search to find pages and API objects, list_documents to browse, \
                 and rebuild after editing sources.",
                self.context.index_path().display()
            ))
    }
}

/// Generate an inline JSON schema for MCP tools
///
/// Unlike rmcp's default `schema_for_type()`, this function sets `inline_subschemas = true`
/// so clients render nested types inline instead of following `$ref` patterns.
pub fn inline_schema_for_type<T: JsonSchema>() -> Arc<JsonObject> {
    let mut settings = SchemaSettings::draft07();
    settings.transforms = vec![Box::new(schemars::transform::AddNullable::default())];
    settings.inline_subschemas = true;

    let generator = settings.into_generator();
    let schema = generator.into_root_schema_for::<T>();
    let json_object = match serde_json::to_value(schema) {
        Ok(serde_json::Value::Object(object)) => object,
        _ => JsonObject::new(),
    };

    Arc::new(json_object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};

    #[test]
    fn requested_index_overrides_default() {
        let context = ServerContext::new(
            Config::default(),
            Some(PathBuf::from("site/searchindex.js")),
            Arc::new(IndexState::new()),
        )
        .unwrap();
        check!(context.resolve_index(None) == Path::new("site/searchindex.js"));
        check!(context.resolve_index(Some("  ")) == Path::new("site/searchindex.js"));
        check!(context.resolve_index(Some("other.js")) == Path::new("other.js"));
    }

    #[test]
    fn unknown_language_is_rejected() {
        let mut config = Config::default();
        config.search.language = "xx".to_string();
        let_assert!(
            Err(ConfigError::UnsupportedLanguage(code)) =
                ServerContext::new(config, None, Arc::new(IndexState::new()))
        );
        check!(code == "xx");
    }

    #[test]
    fn tool_schemas_are_objects() {
        let schema = inline_schema_for_type::<SearchRequest>();
        check!(schema.contains_key("properties"));
    }
}
