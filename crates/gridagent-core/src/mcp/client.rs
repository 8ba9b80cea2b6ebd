//! MCP client using the official rmcp SDK
//!
//! Connects to tool servers over a spawned child process (stdio), a Unix
//! socket or streamable HTTP.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rmcp::{
    model::{
        CallToolRequestParams, CallToolResult, ClientCapabilities, ClientInfo, Implementation,
        RawContent, Tool,
    },
    service::RunningService,
    RoleClient, ServiceExt,
};
use serde_json::Value;
use thiserror::Error;

#[cfg(unix)]
use tokio::net::UnixStream;

use crate::logging::Logger;
use crate::types::{ToolDescriptor, ToolOutput};

/// MCP client errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    #[error("Tool '{tool}' timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

pub type McpResult<T> = Result<T, McpError>;

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "gridagent".to_string(),
            title: Some("Grid Agent".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    }
}

/// A live session with one MCP server
pub struct McpClient {
    client: RunningService<RoleClient, ClientInfo>,
    logger: Arc<dyn Logger>,
}

impl McpClient {
    /// Spawn `command args` and talk MCP over its stdin/stdout
    pub async fn connect_stdio(
        command: &str,
        args: &[String],
        cwd: Option<&Path>,
        env: &HashMap<String, String>,
        logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        use rmcp::transport::TokioChildProcess;

        logger.info(&format!(
            "[McpClient] Spawning {} {}",
            command,
            args.join(" ")
        ));

        let mut cmd = tokio::process::Command::new(command);
        cmd.args(args).envs(env);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let transport =
            TokioChildProcess::new(cmd).map_err(|e| McpError::ConnectionFailed(e.to_string()))?;

        let client = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;
        Ok(Self::ready(client, logger))
    }

    /// Connect to an MCP server over a Unix socket
    #[cfg(unix)]
    pub async fn connect_unix<P: AsRef<Path>>(
        socket_path: P,
        logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        let path = socket_path.as_ref();
        logger.info(&format!("[McpClient] Connecting to Unix socket: {:?}", path));

        let stream = UnixStream::connect(path)
            .await
            .map_err(|e| McpError::ConnectionFailed(e.to_string()))?;

        Self::connect_stream(stream, logger).await
    }

    /// Speak MCP over an already connected byte stream
    pub async fn connect_stream<S>(stream: S, logger: Arc<dyn Logger>) -> McpResult<Self>
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + 'static,
    {
        let client = client_info()
            .serve(stream)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;
        Ok(Self::ready(client, logger))
    }

    /// Connect to an MCP server over HTTP (Streamable HTTP transport)
    pub async fn connect_http(url: &str, logger: Arc<dyn Logger>) -> McpResult<Self> {
        use rmcp::transport::StreamableHttpClientTransport;

        logger.info(&format!("[McpClient] Connecting to HTTP: {}", url));
        let transport = StreamableHttpClientTransport::from_uri(url);
        let client = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;
        Ok(Self::ready(client, logger))
    }

    fn ready(client: RunningService<RoleClient, ClientInfo>, logger: Arc<dyn Logger>) -> Self {
        logger.info("[McpClient] Connected and initialized successfully");
        Self { client, logger }
    }

    /// List all available tools
    pub async fn list_tools(&self) -> McpResult<Vec<ToolDescriptor>> {
        let result = self
            .client
            .list_tools(Default::default())
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;

        self.logger
            .info(&format!("[McpClient] Listed {} tools", result.tools.len()));

        Ok(result.tools.into_iter().map(descriptor_from_tool).collect())
    }

    /// Call a tool by name
    pub async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutput> {
        self.logger.debug(&format!("[McpClient] Calling tool: {}", name));

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
        };

        let result = self
            .client
            .call_tool(params)
            .await
            .map_err(|e| McpError::ToolCallFailed(e.to_string()))?;

        Ok(output_from_result(&result))
    }

    /// Name of the connected server, if it reported one
    pub fn server_name(&self) -> Option<String> {
        self.client
            .peer_info()
            .map(|info| info.server_info.name.clone())
    }

    /// Close the connection
    pub async fn close(self) -> McpResult<()> {
        self.logger.info("[McpClient] Closing connection");
        self.client
            .cancel()
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;
        Ok(())
    }
}

pub(crate) fn descriptor_from_tool(tool: Tool) -> ToolDescriptor {
    let description = tool
        .description
        .map(|d| d.to_string())
        .unwrap_or_default();
    ToolDescriptor::new(tool.name.to_string(), description)
        .with_schema(Value::Object((*tool.input_schema).clone()))
}

/// Join the text parts of a result; JSON text becomes a JSON value
pub(crate) fn output_from_result(result: &CallToolResult) -> ToolOutput {
    let text = result
        .content
        .iter()
        .filter_map(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    if result.is_error.unwrap_or(false) {
        let message = if text.is_empty() {
            "Tool reported an error".to_string()
        } else {
            text
        };
        return ToolOutput::Failure(message);
    }

    ToolOutput::Success(parse_text(&text))
}

pub(crate) fn parse_text(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::Content;
    use serde_json::json;

    #[test]
    fn test_parse_text() {
        assert_eq!(parse_text(r#"{"status":"success"}"#), json!({"status": "success"}));
        assert_eq!(parse_text("plain words"), json!("plain words"));
    }

    #[test]
    fn test_output_from_result() {
        let ok = CallToolResult::success(vec![Content::text(r#"{"converged":true}"#)]);
        assert_eq!(
            output_from_result(&ok),
            ToolOutput::Success(json!({"converged": true}))
        );

        let failed = CallToolResult::error(vec![Content::text("boom")]);
        assert_eq!(output_from_result(&failed), ToolOutput::Failure("boom".into()));
    }

    #[test]
    fn test_descriptor_from_tool() {
        let schema = json!({"type": "object", "properties": {"file_path": {"type": "string"}}});
        let tool = Tool::new(
            "load_network",
            "Load a network",
            Arc::new(schema.as_object().cloned().unwrap_or_default()),
        );
        let descriptor = descriptor_from_tool(tool);
        assert_eq!(descriptor.name, "load_network");
        assert_eq!(descriptor.description, "Load a network");
        assert_eq!(descriptor.input_schema, schema);
    }
}
