//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::host::Host;
use crate::tools::cache::{CacheListParams, list_impl};
use crate::tools::{
    SwDeployParams, SwFetchParams, SwPostMessageParams, activate_waiting_impl, deploy_impl, fetch_impl,
    post_message_impl, status_impl,
};

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

/// The main MCP server handler for vitrine-sw.
#[derive(Clone)]
pub struct VitrineServer {
    host: Arc<Host>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl VitrineServer {
    /// Create a new server handler around a host.
    pub fn new(host: Arc<Host>) -> Self {
        Self { host, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Send a request through the controlling cache worker, as a page would. Reports the response and whether it came from the network, the cache, or a synthetic fallback."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.host, params.0).await
    }

    #[tool(
        description = "Post a message to the controlling worker. {\"type\": \"CACHE_URLS\", \"urls\": [...]} warms the runtime cache."
    )]
    async fn sw_post_message(&self, params: Parameters<SwPostMessageParams>) -> Result<CallToolResult, McpError> {
        post_message_impl(&self.host, params.0).await
    }

    /// Install a new worker version.
    ///
    /// The shell is cached all-or-nothing; a failed install leaves the current
    /// worker in control.
    #[tool(description = "Install a worker version. It activates at once if nothing is in control, otherwise it waits.")]
    async fn sw_deploy(&self, params: Parameters<SwDeployParams>) -> Result<CallToolResult, McpError> {
        deploy_impl(&self.host, params.0).await
    }

    #[tool(description = "Activate the waiting worker, deleting superseded cache generations.")]
    async fn sw_activate_waiting(&self) -> Result<CallToolResult, McpError> {
        activate_waiting_impl(&self.host).await
    }

    #[tool(description = "Show the active and waiting workers and every cache generation with its entry count.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.host).await
    }

    #[tool(description = "List the request identities stored in one cache generation.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.host, params.0).await
    }
}

impl ServerHandler for VitrineServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "vitrine-sw".into(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::host;

    #[test]
    fn test_lists_all_tools() {
        let (_network, host) = host();
        let server = VitrineServer::new(Arc::new(host));

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(
            names,
            vec!["cache_list", "sw_activate_waiting", "sw_deploy", "sw_fetch", "sw_post_message", "sw_status"]
        );
    }

    #[test]
    fn test_server_info() {
        let (_network, host) = host();
        let info = VitrineServer::new(Arc::new(host)).get_info();
        assert_eq!(info.server_info.name, "vitrine-sw");
    }
}
