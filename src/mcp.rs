//! MCP protocol bridge.
//!
//! Exposes the [`QueryFacade`] tools to MCP clients, either over stdio
//! (the usual way an editor or assistant launches a local server) or over
//! Streamable HTTP at `/mcp`.
//!
//! Only tools are advertised. Every tool is read-only; writes arrive
//! exclusively through the webhook listener.
//!
//! # Client configuration
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "github-memory": {
//!       "command": "ghmem",
//!       "args": ["--config", "/path/to/ghmem.toml", "serve", "mcp"]
//!     }
//!   }
//! }
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Json, Router};
use rmcp::model::*;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::store::Store;
use crate::tools::QueryFacade;

pub const SERVER_NAME: &str = "github-memory";

/// Bridges the query façade to the MCP JSON-RPC protocol.
///
/// Each MCP session receives a clone; all sessions share one store.
#[derive(Clone)]
pub struct McpBridge {
    facade: QueryFacade,
}

impl McpBridge {
    pub fn new(facade: QueryFacade) -> Self {
        Self { facade }
    }

    fn to_mcp_tool(tool: &dyn crate::tools::Tool) -> Tool {
        let input_schema: Arc<serde_json::Map<String, serde_json::Value>> =
            match tool.parameters_schema() {
                serde_json::Value::Object(map) => Arc::new(map),
                _ => Arc::new(serde_json::Map::new()),
            };

        Tool {
            name: Cow::Owned(tool.name().to_string()),
            title: None,
            description: Some(Cow::Owned(tool.description().to_string())),
            input_schema,
            output_schema: None,
            annotations: Some(ToolAnnotations::new().read_only(true)),
            execution: None,
            icons: None,
            meta: None,
        }
    }
}

impl ServerHandler for McpBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                title: Some("GitHub Memory".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Remembers GitHub pull requests and commits delivered by webhooks. \
                 Use search_pull_requests and search_commits for filtered keyword search, \
                 get_pull_request and get_commit for point lookups."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = self
            .facade
            .tools()
            .iter()
            .map(|t| Self::to_mcp_tool(t.as_ref()))
            .collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.facade.find(name).map(Self::to_mcp_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let args = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        let outcome = self.facade.call(&request.name, args).await;
        let content = vec![Content::text(outcome.text)];
        if outcome.is_error {
            Ok(CallToolResult::error(content))
        } else {
            Ok(CallToolResult::success(content))
        }
    }
}

/// Serve MCP over stdin/stdout until the client disconnects.
pub async fn run_mcp_stdio(store: Arc<dyn Store>) -> anyhow::Result<()> {
    let bridge = McpBridge::new(QueryFacade::new(store));
    tracing::info!("MCP server running on stdio");

    let service = bridge.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;
    Ok(())
}

/// Build the HTTP router: Streamable HTTP MCP at `/mcp`, plus `/health`.
pub fn router(store: Arc<dyn Store>) -> Router {
    let bridge = McpBridge::new(QueryFacade::new(store));
    let service = StreamableHttpService::new(
        move || Ok(bridge.clone()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig::default(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest_service("/mcp", service)
        .route("/health", get(handle_health))
        .layer(cors)
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Serve MCP over Streamable HTTP on `[mcp] bind` until `shutdown` resolves.
pub async fn run_mcp_http(
    config: &Config,
    store: Arc<dyn Store>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = router(store);
    let listener = tokio::net::TcpListener::bind(&config.mcp.bind)
        .await
        .with_context(|| format!("Failed to bind MCP listener to {}", config.mcp.bind))?;
    tracing::info!("MCP server listening on http://{}/mcp", config.mcp.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
