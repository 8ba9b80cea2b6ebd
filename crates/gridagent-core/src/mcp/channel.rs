//! Tool channels: one source of tools each
//!
//! A `RemoteChannel` reaches an MCP server described by a `ChannelConfig`
//! and connects on first use. A `LocalChannel` serves a `PowerToolRegistry`
//! in-process.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;

use super::client::{McpClient, McpError, McpResult};
use crate::config::{ChannelConfig, ChannelTransport, DEFAULT_TOOL_TIMEOUT_SECS};
use crate::logging::Logger;
use crate::tools::PowerToolRegistry;
use crate::types::{ToolDescriptor, ToolOutput};

#[async_trait]
pub trait ToolChannel: Send + Sync {
    fn name(&self) -> &str;

    /// Upper bound for a single call on this channel
    fn timeout(&self) -> Duration {
        Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS)
    }

    async fn list_tools(&self) -> McpResult<Vec<ToolDescriptor>>;

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutput>;
}

/// Channel to an external MCP server
pub struct RemoteChannel {
    name: String,
    config: ChannelConfig,
    client: OnceCell<McpClient>,
    logger: Arc<dyn Logger>,
}

impl RemoteChannel {
    pub fn new(name: impl Into<String>, config: ChannelConfig, logger: Arc<dyn Logger>) -> Self {
        Self {
            name: name.into(),
            config,
            client: OnceCell::new(),
            logger,
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    async fn connect(&self) -> McpResult<McpClient> {
        let logger = Arc::clone(&self.logger);
        match &self.config.transport {
            ChannelTransport::Stdio {
                command,
                args,
                cwd,
                env,
            } => McpClient::connect_stdio(command, args, cwd.as_deref(), env, logger).await,
            ChannelTransport::Http { url } => McpClient::connect_http(url, logger).await,
            #[cfg(unix)]
            ChannelTransport::Unix { path } => McpClient::connect_unix(path, logger).await,
            #[cfg(not(unix))]
            ChannelTransport::Unix { path } => Err(McpError::ConnectionFailed(format!(
                "Unix sockets are not supported on this platform: {}",
                path.display()
            ))),
        }
    }

    async fn client(&self) -> McpResult<&McpClient> {
        self.client.get_or_try_init(|| self.connect()).await
    }
}

#[async_trait]
impl ToolChannel for RemoteChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    async fn list_tools(&self) -> McpResult<Vec<ToolDescriptor>> {
        self.client().await?.list_tools().await
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutput> {
        self.client().await?.call_tool(name, arguments).await
    }
}

/// Channel that runs the power system tools in-process
pub struct LocalChannel {
    name: String,
    registry: Arc<PowerToolRegistry>,
    timeout: Duration,
}

impl LocalChannel {
    pub fn new(name: impl Into<String>, registry: Arc<PowerToolRegistry>) -> Self {
        Self {
            name: name.into(),
            registry,
            timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<PowerToolRegistry> {
        &self.registry
    }
}

#[async_trait]
impl ToolChannel for LocalChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn list_tools(&self) -> McpResult<Vec<ToolDescriptor>> {
        Ok(self.registry.descriptors())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutput> {
        let registry = Arc::clone(&self.registry);
        let tool = name.to_string();
        // Solves are CPU bound
        let payload = tokio::task::spawn_blocking(move || registry.call(&tool, arguments))
            .await
            .map_err(|e| McpError::ToolCallFailed(e.to_string()))?;
        Ok(ToolOutput::Success(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::AnalysisSession;
    use crate::logging::NoOpLogger;
    use serde_json::json;

    fn local() -> LocalChannel {
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger::new());
        let registry = PowerToolRegistry::new(AnalysisSession::new(), logger);
        LocalChannel::new("local", Arc::new(registry))
    }

    #[tokio::test]
    async fn test_local_channel_lists_and_calls() {
        let channel = local();
        let tools = channel.list_tools().await.unwrap();
        assert_eq!(tools.len(), 6);

        let out = channel
            .call_tool("create_empty_network", json!({}))
            .await
            .unwrap();
        match out {
            ToolOutput::Success(v) => assert_eq!(v["status"], "success"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remote_channel_connect_failure() {
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger::new());
        let channel = RemoteChannel::new(
            "missing",
            ChannelConfig::stdio("gridagent-no-such-binary", vec![]),
            logger,
        );
        assert!(channel.list_tools().await.is_err());
        assert_eq!(channel.timeout(), Duration::from_secs(120));
    }
}
