//! File-based configuration provider (YAML)
//!
//! Supports user-level (~/.config/gridagent/config.yaml) and workspace-level
//! (.config/gridagent/config.yaml) config.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::settings::{ChannelConfig, ConfigFile};
use super::traits::{ConfigError, ConfigProvider, ConfigResult};

/// Config level (user or workspace)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    User,
    Workspace,
}

impl ConfigLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLevel::User => "user",
            ConfigLevel::Workspace => "workspace",
        }
    }
}

/// File-based configuration provider
///
/// A missing file is an empty layer; the file is only created when a
/// channel is written.
///
/// # Example
///
/// ```no_run
/// use gridagent_core::config::FileConfigProvider;
///
/// let user_config = FileConfigProvider::user();
/// let workspace_config = FileConfigProvider::workspace("/path/to/workspace");
/// ```
pub struct FileConfigProvider {
    path: PathBuf,
    level: ConfigLevel,
    cache: RwLock<Option<ConfigFile>>,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>, level: ConfigLevel) -> Self {
        Self {
            path: path.into(),
            level,
            cache: RwLock::new(None),
        }
    }

    pub fn user() -> Self {
        let config_dir = dirs::config_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
        });
        Self::new(config_dir.join("gridagent").join("config.yaml"), ConfigLevel::User)
    }

    pub fn workspace(workspace_root: impl AsRef<Path>) -> Self {
        let path = workspace_root
            .as_ref()
            .join(".config")
            .join("gridagent")
            .join("config.yaml");
        Self::new(path, ConfigLevel::Workspace)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn level(&self) -> ConfigLevel {
        self.level
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self) -> ConfigResult<ConfigFile> {
        if !self.path.exists() {
            return Ok(ConfigFile::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ConfigFile::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    fn save(&self, config: &ConfigFile) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_yaml::to_string(config)?)?;
        *self.cache.write() = Some(config.clone());
        Ok(())
    }

    fn cached(&self) -> ConfigResult<ConfigFile> {
        if let Some(config) = self.cache.read().as_ref() {
            return Ok(config.clone());
        }
        self.reload()
    }

    /// Reload config from disk (invalidate cache)
    pub fn reload(&self) -> ConfigResult<ConfigFile> {
        let config = self.load()?;
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }

    /// Replace the whole layer
    pub fn write(&self, config: &ConfigFile) -> ConfigResult<()> {
        self.save(config)
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("level", &self.level)
            .field("exists", &self.exists())
            .finish()
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    fn name(&self) -> &str {
        self.level.as_str()
    }

    async fn get_config(&self) -> ConfigResult<ConfigFile> {
        self.cached()
    }

    async fn set_channel(&self, name: &str, channel: ChannelConfig) -> ConfigResult<()> {
        let mut config = self.cached()?;
        config.mcp_servers.insert(name.to_string(), channel);
        self.save(&config)
    }

    async fn remove_channel(&self, name: &str) -> ConfigResult<()> {
        let mut config = self.cached()?;
        if config.mcp_servers.remove(name).is_none() {
            return Err(ConfigError::ChannelNotFound(name.to_string()));
        }
        self.save(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolExecution;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_is_empty_layer() {
        let dir = tempdir().unwrap();
        let provider = FileConfigProvider::new(dir.path().join("config.yaml"), ConfigLevel::User);
        assert!(!provider.exists());
        assert!(provider.get_config().await.unwrap().is_empty());
        assert_eq!(provider.name(), "user");
    }

    #[tokio::test]
    async fn test_channels_persist() {
        let dir = tempdir().unwrap();
        let provider = FileConfigProvider::workspace(dir.path());
        provider
            .set_channel("remote", ChannelConfig::http("http://localhost:8000/mcp"))
            .await
            .unwrap();
        assert!(provider.exists());
        assert!(provider.path().ends_with(".config/gridagent/config.yaml"));

        let content = fs::read_to_string(provider.path()).unwrap();
        assert!(content.contains("transport: http"));

        let reloaded = provider.reload().unwrap();
        assert_eq!(reloaded.mcp_servers.len(), 1);

        provider.remove_channel("remote").await.unwrap();
        assert!(matches!(
            provider.remove_channel("remote").await,
            Err(ConfigError::ChannelNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reads_hand_written_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "temperature: 0.1\ntool_execution: concurrent\n").unwrap();
        let provider = FileConfigProvider::new(&path, ConfigLevel::User);
        let layer = provider.get_config().await.unwrap();
        assert_eq!(layer.temperature, Some(0.1));
        assert_eq!(layer.tool_execution, Some(ToolExecution::Concurrent));
        assert!(layer.model.is_none());
    }

    #[tokio::test]
    async fn test_bad_yaml_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "temperature: [not, a, number]\n").unwrap();
        let provider = FileConfigProvider::new(&path, ConfigLevel::User);
        assert!(matches!(
            provider.get_config().await,
            Err(ConfigError::Yaml(_))
        ));
    }
}
