//! Configuration provider trait

use async_trait::async_trait;

use super::settings::{ChannelConfig, ConfigFile};

/// A source of configuration layers
///
/// Implementations:
/// - `MemoryConfigProvider`: In-memory for testing and embedding
/// - `FileConfigProvider`: YAML file (~/.config/gridagent/config.yaml or
///   `<workspace>/.config/gridagent/config.yaml`)
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Source name used in log lines
    fn name(&self) -> &str;

    /// The layer this source contributes
    async fn get_config(&self) -> ConfigResult<ConfigFile>;

    /// Add or replace a tool server channel
    async fn set_channel(&self, name: &str, channel: ChannelConfig) -> ConfigResult<()>;

    /// Remove a tool server channel
    async fn remove_channel(&self, name: &str) -> ConfigResult<()>;
}

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Other(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
