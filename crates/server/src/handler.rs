//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{CacheGetParams, get_impl, keys_impl};
use crate::tools::sw_fetch::{SwFetchParams, fetch_impl};
use crate::tools::sw_status::status_impl;
use crate::tools::sw_sync::{SwSyncParams, sync_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use shellcache_core::CacheController;

/// The main MCP server handler for shellcache.
#[derive(Clone)]
pub struct ShellcacheServer {
    tool_router: ToolRouter<Self>,
    controller: Arc<CacheController>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ShellcacheServer {
    /// Create a new server handler around a controller.
    pub fn new(controller: Arc<CacheController>) -> Self {
        Self { tool_router: Self::tool_router(), controller }
    }

    /// Intercept one request.
    ///
    /// GET requests are served cache-first; other methods go straight to the network.
    #[tool(
        description = "Intercept a request: serve it from the offline cache if present, otherwise fetch it from the network and cache same-origin successes. Document requests fall back to the cached shell page when offline."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.controller, params.0).await
    }

    #[tool(description = "Deliver a background sync event by tag. Returns whether the tag was handled.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.controller, params.0).await
    }

    #[tool(description = "Report the controller phase, current cache name, origin and all cache stores.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.controller).await
    }

    #[tool(description = "List the request URLs held by the current cache store.")]
    async fn cache_keys(&self) -> Result<CallToolResult, McpError> {
        keys_impl(&self.controller).await
    }

    #[tool(description = "Read one cached response by URL without touching the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.controller, params.0).await
    }
}

impl ServerHandler for ShellcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shellcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
