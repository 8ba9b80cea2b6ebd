//! MCP server exposing the power system tools
//!
//! Tool arguments are handed to the registry untouched so that argument
//! errors come back in the registry's `{status: "error", ...}` shape
//! instead of as protocol errors.

use std::sync::Arc;

use rmcp::{
    model::{
        CallToolRequestParams, CallToolResult, Content, ListToolsResult, PaginatedRequestParams,
        ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    ErrorData, RoleServer, ServerHandler, ServiceExt,
};
use serde_json::Value;

use crate::log_error;
use crate::logging::Logger;
use crate::tools::PowerToolRegistry;
use crate::types::ToolDescriptor;

const INSTRUCTIONS: &str = "Power system analysis tools. Load a network with load_network (or \
create one with create_empty_network), then run run_power_flow or run_contingency_analysis. \
get_network_info describes the current network. load_and_run_power_flow does load and solve in \
one call. Every tool answers with a JSON object carrying status and message fields.";

#[derive(Clone)]
pub struct GridToolServer {
    registry: Arc<PowerToolRegistry>,
    logger: Arc<dyn Logger>,
}

impl GridToolServer {
    pub fn new(registry: Arc<PowerToolRegistry>, logger: Arc<dyn Logger>) -> Self {
        Self { registry, logger }
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.registry.descriptors().into_iter().map(to_mcp_tool).collect()
    }

    /// Run one call on a blocking thread and wrap the payload as text
    pub async fn dispatch(&self, name: &str, arguments: Value) -> CallToolResult {
        let registry = Arc::clone(&self.registry);
        let tool = name.to_string();
        match tokio::task::spawn_blocking(move || registry.call(&tool, arguments)).await {
            Ok(payload) => CallToolResult::success(vec![Content::text(payload.to_string())]),
            Err(e) => {
                log_error!(self.logger, "[GridToolServer] {} aborted: {}", name, e);
                CallToolResult::error(vec![Content::text(format!(
                    "Tool '{}' failed: {}",
                    name, e
                ))])
            }
        }
    }
}

fn to_mcp_tool(descriptor: ToolDescriptor) -> Tool {
    let schema = match descriptor.input_schema {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    Tool::new(descriptor.name, descriptor.description, Arc::new(schema))
}

impl ServerHandler for GridToolServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let arguments = request.arguments.map(Value::Object).unwrap_or(Value::Null);
        Ok(self.dispatch(&request.name, arguments).await)
    }
}

/// Serve the tools over stdin/stdout until the client disconnects
pub async fn serve_stdio(
    registry: Arc<PowerToolRegistry>,
    logger: Arc<dyn Logger>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    logger.info("[GridToolServer] Serving tools on stdio");
    let service = GridToolServer::new(registry, Arc::clone(&logger))
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| logger.error(&format!("[GridToolServer] Startup failed: {}", e)))?;
    service.waiting().await?;
    logger.info("[GridToolServer] Client disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::AnalysisSession;
    use crate::logging::NoOpLogger;
    use crate::mcp::client::output_from_result;
    use crate::types::ToolOutput;
    use serde_json::json;

    fn server() -> GridToolServer {
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger::new());
        let registry = PowerToolRegistry::new(AnalysisSession::new(), Arc::clone(&logger));
        GridToolServer::new(Arc::new(registry), logger)
    }

    #[test]
    fn test_tools_carry_schemas() {
        let tools = server().tools();
        assert_eq!(tools.len(), 6);
        let load = tools.iter().find(|t| t.name == "load_network").unwrap();
        assert!(load.input_schema.contains_key("properties"));
        assert!(server().get_info().capabilities.tools.is_some());
    }

    #[tokio::test]
    async fn test_dispatch_payload_round_trips_as_json() {
        let server = server();
        let result = server.dispatch("get_network_info", json!({})).await;
        match output_from_result(&result) {
            ToolOutput::Success(v) => {
                assert_eq!(v["status"], "error");
                assert_eq!(v["error_kind"], "no_network_loaded");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
