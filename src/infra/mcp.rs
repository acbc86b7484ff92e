//! MCP server integration for pylon-mcp-gateway.
//!
//! Tools are published from the capability table rather than a macro router,
//! so `list_tools` and `call_tool` are implemented by hand. Capability
//! failures come back as `isError` results; only protocol faults (unknown
//! tool) become JSON-RPC errors.

use std::future::Future;
use std::sync::Arc;

use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam,
        ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    ErrorData as McpError, RoleServer, ServerHandler,
};
use tokio_util::sync::CancellationToken;

use crate::core::error::CapabilityError;
use crate::core::schema::JsonObject;
use crate::tools::CapabilityRegistry;

pub const SERVER_NAME: &str = "pylon-ai";

#[derive(Clone)]
pub struct PylonSvc {
    registry: CapabilityRegistry,
}

impl PylonSvc {
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self { registry }
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.registry
            .list()
            .iter()
            .map(|def| Tool::new(def.name, def.description, Arc::new(def.input_schema())))
            .collect()
    }

    pub async fn dispatch(
        &self,
        request: CallToolRequestParam,
        ct: &CancellationToken,
    ) -> Result<CallToolResult, McpError> {
        let args = request.arguments.unwrap_or_default();
        match self.registry.call(&request.name, &args, ct).await {
            Ok(outcome) => Ok(outcome.into()),
            Err(err @ CapabilityError::UnknownTool(_)) => Err(McpError::invalid_params(err.to_string(), None)),
            Err(err) => Err(McpError::internal_error(err.to_string(), None)),
        }
    }
}

impl ServerHandler for PylonSvc {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Pylon capabilities: screenshots, PDF parsing, QR codes, domain intel, email validation, \
                 image resizing, Markdown/HTML to PDF, OCR and crypto alpha alerts."
                    .to_string(),
            ),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult {
            tools: self.tools(),
            next_cursor: None,
        }))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move { self.dispatch(request, &context.ct).await }
    }
}

/// Convenience for callers that only have a JSON object of arguments.
pub fn call_request(name: &str, arguments: JsonObject) -> CallToolRequestParam {
    CallToolRequestParam {
        name: name.to_owned().into(),
        arguments: Some(arguments),
    }
}
