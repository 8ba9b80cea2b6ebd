//! Tool transport: every configured channel behind one tool list
//!
//! The catalog is built on the first `list_tools` call and kept for the
//! lifetime of the transport. Channels that cannot be reached, or do not
//! answer within their timeout, are logged and left out; they never make
//! `list_tools` fail.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;

use super::channel::{RemoteChannel, ToolChannel};
use super::client::McpError;
use crate::config::AgentConfig;
use crate::logging::Logger;
use crate::types::{ToolCall, ToolDescriptor, ToolOutput, ToolResult};
use crate::{log_debug, log_info, log_warn};

struct Catalog {
    tools: Vec<ToolDescriptor>,
    owners: HashMap<String, usize>,
}

pub struct ToolTransport {
    channels: Vec<Arc<dyn ToolChannel>>,
    catalog: OnceCell<Catalog>,
    timeout_override: Option<Duration>,
    logger: Arc<dyn Logger>,
}

impl ToolTransport {
    pub fn with_channels(channels: Vec<Arc<dyn ToolChannel>>, logger: Arc<dyn Logger>) -> Self {
        Self {
            channels,
            catalog: OnceCell::new(),
            timeout_override: None,
            logger,
        }
    }

    /// One remote channel per enabled `mcp_servers` entry; none when tools
    /// are switched off
    pub fn from_config(config: &AgentConfig, logger: Arc<dyn Logger>) -> Self {
        let channels = config
            .active_channels()
            .into_iter()
            .map(|(name, channel)| {
                Arc::new(RemoteChannel::new(name, channel.clone(), Arc::clone(&logger)))
                    as Arc<dyn ToolChannel>
            })
            .collect();
        Self::with_channels(channels, logger)
    }

    /// A transport with no channels
    pub fn disabled(logger: Arc<dyn Logger>) -> Self {
        Self::with_channels(Vec::new(), logger)
    }

    /// Apply the same per-call timeout to every channel
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_override = Some(timeout);
        self
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn limit(&self, channel: &dyn ToolChannel) -> Duration {
        self.timeout_override.unwrap_or_else(|| channel.timeout())
    }

    async fn catalog(&self) -> &Catalog {
        self.catalog.get_or_init(|| self.build_catalog()).await
    }

    async fn build_catalog(&self) -> Catalog {
        let mut tools = Vec::new();
        let mut owners = HashMap::new();

        for (idx, channel) in self.channels.iter().enumerate() {
            let limit = self.limit(channel.as_ref());
            let listed = match tokio::time::timeout(limit, channel.list_tools()).await {
                Ok(Ok(listed)) => listed,
                Ok(Err(e)) => {
                    log_warn!(
                        self.logger,
                        "[ToolTransport] Skipping channel '{}': {}",
                        channel.name(),
                        e
                    );
                    continue;
                }
                Err(_) => {
                    log_warn!(
                        self.logger,
                        "[ToolTransport] Skipping channel '{}': no tool list after {}s",
                        channel.name(),
                        limit.as_secs()
                    );
                    continue;
                }
            };
            log_info!(
                self.logger,
                "[ToolTransport] Channel '{}' offers {} tools",
                channel.name(),
                listed.len()
            );
            for tool in listed {
                if owners.contains_key(&tool.name) {
                    log_warn!(
                        self.logger,
                        "[ToolTransport] Tool '{}' from '{}' shadowed by an earlier channel",
                        tool.name,
                        channel.name()
                    );
                    continue;
                }
                owners.insert(tool.name.clone(), idx);
                tools.push(tool);
            }
        }

        Catalog { tools, owners }
    }

    /// Every tool offered by a reachable channel
    pub async fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.catalog().await.tools.clone()
    }

    /// Run one call; every fault comes back as a failed `ToolResult`
    pub async fn invoke(&self, call: &ToolCall) -> ToolResult {
        match self.forward(call).await {
            Ok(ToolOutput::Success(value)) => ToolResult::success(&call.id, &call.name, value),
            Ok(ToolOutput::Failure(message)) => {
                log_warn!(
                    self.logger,
                    "[ToolTransport] Tool '{}' reported an error: {}",
                    call.name,
                    message
                );
                ToolResult::failure(&call.id, &call.name, message)
            }
            Err(e) => {
                log_warn!(self.logger, "[ToolTransport] {}", e);
                ToolResult::failure(&call.id, &call.name, e.to_string())
            }
        }
    }

    async fn forward(&self, call: &ToolCall) -> Result<ToolOutput, McpError> {
        let catalog = self.catalog().await;
        let idx = *catalog
            .owners
            .get(&call.name)
            .ok_or_else(|| McpError::ToolNotFound(call.name.clone()))?;
        let channel = &self.channels[idx];
        let limit = self.limit(channel.as_ref());

        log_debug!(
            self.logger,
            "[ToolTransport] {} -> channel '{}'",
            call.name,
            channel.name()
        );

        match tokio::time::timeout(limit, channel.call_tool(&call.name, call.input.clone())).await {
            Ok(result) => result,
            Err(_) => Err(McpError::Timeout {
                tool: call.name.clone(),
                secs: limit.as_secs(),
            }),
        }
    }
}
