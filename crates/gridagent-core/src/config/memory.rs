//! In-memory configuration provider

use async_trait::async_trait;
use parking_lot::RwLock;

use super::settings::{ChannelConfig, ConfigFile};
use super::traits::{ConfigError, ConfigProvider, ConfigResult};

/// In-memory configuration layer for tests and embedders
///
/// Channel names are matched case-insensitively on removal.
#[derive(Debug, Default)]
pub struct MemoryConfigProvider {
    config: RwLock<ConfigFile>,
}

impl MemoryConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ConfigFile) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    pub fn set_config(&self, config: ConfigFile) {
        *self.config.write() = config;
    }

    pub fn clear(&self) {
        *self.config.write() = ConfigFile::default();
    }
}

#[async_trait]
impl ConfigProvider for MemoryConfigProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get_config(&self) -> ConfigResult<ConfigFile> {
        Ok(self.config.read().clone())
    }

    async fn set_channel(&self, name: &str, channel: ChannelConfig) -> ConfigResult<()> {
        let mut guard = self.config.write();
        let existing = guard
            .mcp_servers
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned();
        guard
            .mcp_servers
            .insert(existing.unwrap_or_else(|| name.to_string()), channel);
        Ok(())
    }

    async fn remove_channel(&self, name: &str) -> ConfigResult<()> {
        let mut guard = self.config.write();
        let before = guard.mcp_servers.len();
        guard.mcp_servers.retain(|k, _| !k.eq_ignore_ascii_case(name));
        if guard.mcp_servers.len() == before {
            Err(ConfigError::ChannelNotFound(name.to_string()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_config_provider() {
        let config = MemoryConfigProvider::new();
        assert!(config.get_config().await.unwrap().is_empty());

        config
            .set_channel("Remote", ChannelConfig::http("http://a/mcp"))
            .await
            .unwrap();
        // case insensitive replace keeps the first spelling
        config
            .set_channel("remote", ChannelConfig::http("http://b/mcp"))
            .await
            .unwrap();
        let layer = config.get_config().await.unwrap();
        assert_eq!(layer.mcp_servers.len(), 1);
        assert_eq!(layer.mcp_servers["Remote"].target(), "http://b/mcp");

        config.remove_channel("REMOTE").await.unwrap();
        assert!(matches!(
            config.remove_channel("remote").await,
            Err(ConfigError::ChannelNotFound(_))
        ));
    }
}
