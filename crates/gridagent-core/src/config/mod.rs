//! Configuration
//!
//! Layers, lowest precedence first:
//! - built-in defaults (`AgentConfig::default`)
//! - configuration sources (`FileConfigProvider`, `MemoryConfigProvider`),
//!   in the order given
//! - environment (`CHAT_MODEL`, `TEMPERATURE`, `ENABLE_MCP`,
//!   `GRIDAGENT_TOOL_EXECUTION`)
//! - an explicit override passed by the caller

mod file;
mod memory;
mod settings;
mod traits;

use std::sync::Arc;

pub use file::{ConfigLevel, FileConfigProvider};
pub use memory::MemoryConfigProvider;
pub use settings::{
    AgentConfig, ChannelConfig, ChannelTransport, ConfigFile, ToolExecution, DEFAULT_CHANNEL,
    DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TOOL_TIMEOUT_SECS, ENV_ENABLE_TOOLS, ENV_MODEL,
    ENV_TEMPERATURE, ENV_TOOL_EXECUTION,
};
pub use traits::{ConfigError, ConfigProvider, ConfigResult};

use crate::logging::Logger;

/// Build the effective configuration from every layer
pub async fn resolve_config<F>(
    sources: &[Arc<dyn ConfigProvider>],
    env: F,
    overrides: Option<&ConfigFile>,
    logger: &dyn Logger,
) -> ConfigResult<AgentConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = AgentConfig::default();

    for source in sources {
        let layer = source.get_config().await?;
        if !layer.is_empty() {
            logger.debug(&format!("[Config] Applying {} configuration", source.name()));
        }
        config.merge(&layer);
    }

    config.apply_env(env)?;

    if let Some(layer) = overrides {
        config.merge(layer);
    }

    config.validate()?;
    logger.info(&format!(
        "[Config] model={} tools={} execution={} channels={}",
        config.model,
        config.enable_tools,
        config.tool_execution.as_str(),
        config.active_channels().len()
    ));
    Ok(config)
}

/// Resolve with the user file, an optional workspace file and the process
/// environment
pub async fn load_config(
    workspace: Option<&std::path::Path>,
    overrides: Option<&ConfigFile>,
    logger: &dyn Logger,
) -> ConfigResult<AgentConfig> {
    let mut sources: Vec<Arc<dyn ConfigProvider>> = vec![Arc::new(FileConfigProvider::user())];
    if let Some(root) = workspace {
        sources.push(Arc::new(FileConfigProvider::workspace(root)));
    }
    resolve_config(&sources, |key| std::env::var(key).ok(), overrides, logger).await
}
