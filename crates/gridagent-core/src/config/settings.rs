//! Agent settings: model selection, tool execution and tool server channels

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::traits::{ConfigError, ConfigResult};

pub const DEFAULT_MODEL: &str = "openai/gpt-4o";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_CHANNEL: &str = "pandapower";
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 120;

pub const ENV_MODEL: &str = "CHAT_MODEL";
pub const ENV_TEMPERATURE: &str = "TEMPERATURE";
pub const ENV_ENABLE_TOOLS: &str = "ENABLE_MCP";
pub const ENV_TOOL_EXECUTION: &str = "GRIDAGENT_TOOL_EXECUTION";

fn default_timeout_secs() -> u64 {
    DEFAULT_TOOL_TIMEOUT_SECS
}

fn default_enabled() -> bool {
    true
}

/// How the tool calls requested in one model response are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolExecution {
    /// One after another, in request order
    #[default]
    Sequential,
    /// All at once; results are still reported in request order
    Concurrent,
}

impl ToolExecution {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolExecution::Sequential => "sequential",
            ToolExecution::Concurrent => "concurrent",
        }
    }
}

impl FromStr for ToolExecution {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(ToolExecution::Sequential),
            "concurrent" | "parallel" => Ok(ToolExecution::Concurrent),
            other => Err(ConfigError::InvalidValue {
                key: "tool_execution".into(),
                value: other.into(),
            }),
        }
    }
}

/// How to reach one tool server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum ChannelTransport {
    /// Spawn `command args` and speak MCP over its stdin/stdout
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        env: HashMap<String, String>,
    },
    /// Streamable HTTP endpoint
    Http { url: String },
    /// Unix domain socket
    Unix { path: PathBuf },
}

/// One entry of `mcp_servers`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(flatten)]
    pub transport: ChannelTransport,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ChannelConfig {
    pub fn stdio(command: impl Into<String>, args: Vec<String>) -> Self {
        Self::from_transport(ChannelTransport::Stdio {
            command: command.into(),
            args,
            cwd: None,
            env: HashMap::new(),
        })
    }

    pub fn http(url: impl Into<String>) -> Self {
        Self::from_transport(ChannelTransport::Http { url: url.into() })
    }

    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self::from_transport(ChannelTransport::Unix { path: path.into() })
    }

    fn from_transport(transport: ChannelTransport) -> Self {
        Self {
            transport,
            timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            enabled: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        if let ChannelTransport::Stdio { cwd, .. } = &mut self.transport {
            *cwd = Some(dir.into());
        }
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let ChannelTransport::Stdio { env, .. } = &mut self.transport {
            env.insert(key.into(), value.into());
        }
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Short human readable target, used in log lines
    pub fn target(&self) -> String {
        match &self.transport {
            ChannelTransport::Stdio { command, args, .. } if args.is_empty() => command.clone(),
            ChannelTransport::Stdio { command, args, .. } => {
                format!("{} {}", command, args.join(" "))
            }
            ChannelTransport::Http { url } => url.clone(),
            ChannelTransport::Unix { path } => path.display().to_string(),
        }
    }

    /// The bundled analysis server: this binary started as `gridagent serve`
    pub fn bundled() -> Self {
        Self::stdio("gridagent", vec!["serve".to_string()])
    }
}

/// Fully resolved settings used by the chat agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub model: String,
    pub temperature: f32,
    pub enable_tools: bool,
    pub tool_execution: ToolExecution,
    pub mcp_servers: BTreeMap<String, ChannelConfig>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        let mut mcp_servers = BTreeMap::new();
        mcp_servers.insert(DEFAULT_CHANNEL.to_string(), ChannelConfig::bundled());
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            enable_tools: true,
            tool_execution: ToolExecution::default(),
            mcp_servers,
        }
    }
}

impl AgentConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_tool_execution(mut self, execution: ToolExecution) -> Self {
        self.tool_execution = execution;
        self
    }

    pub fn without_tools(mut self) -> Self {
        self.enable_tools = false;
        self
    }

    /// Replace every channel with `channels`
    pub fn with_channels(
        mut self,
        channels: impl IntoIterator<Item = (String, ChannelConfig)>,
    ) -> Self {
        self.mcp_servers = channels.into_iter().collect();
        self
    }

    /// Enabled channels; empty when tools are switched off
    pub fn active_channels(&self) -> Vec<(&str, &ChannelConfig)> {
        if !self.enable_tools {
            return Vec::new();
        }
        self.mcp_servers
            .iter()
            .filter(|(_, c)| c.enabled)
            .map(|(name, c)| (name.as_str(), c))
            .collect()
    }

    /// Apply a partial layer on top; set fields win, channels merge by name
    pub fn merge(&mut self, layer: &ConfigFile) {
        if let Some(model) = &layer.model {
            self.model = model.clone();
        }
        if let Some(temperature) = layer.temperature {
            self.temperature = temperature;
        }
        if let Some(enable) = layer.enable_tools {
            self.enable_tools = enable;
        }
        if let Some(execution) = layer.tool_execution {
            self.tool_execution = execution;
        }
        for (name, channel) in &layer.mcp_servers {
            self.mcp_servers.insert(name.clone(), channel.clone());
        }
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.merge(&ConfigFile::from_env(lookup)?);
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "model".into(),
                value: self.model.clone(),
            });
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "temperature".into(),
                value: self.temperature.to_string(),
            });
        }
        for (name, channel) in &self.mcp_servers {
            if channel.timeout_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: format!("mcp_servers.{}.timeout_secs", name),
                    value: "0".into(),
                });
            }
        }
        Ok(())
    }
}

/// A partial configuration layer, as stored in a YAML file or passed as
/// an explicit override
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_tools: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_execution: Option<ToolExecution>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub mcp_servers: BTreeMap<String, ChannelConfig>,
}

impl ConfigFile {
    /// Layer built from environment variables; unset variables leave
    /// their field empty
    pub fn from_env<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut layer = ConfigFile::default();

        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.trim().is_empty()) {
            layer.model = Some(model.trim().to_string());
        }
        if let Some(raw) = lookup(ENV_TEMPERATURE) {
            let temperature = raw.trim().parse::<f32>().map_err(|_| ConfigError::InvalidValue {
                key: ENV_TEMPERATURE.into(),
                value: raw.clone(),
            })?;
            layer.temperature = Some(temperature);
        }
        if let Some(raw) = lookup(ENV_ENABLE_TOOLS) {
            layer.enable_tools = Some(parse_flag(ENV_ENABLE_TOOLS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_TOOL_EXECUTION) {
            layer.tool_execution = Some(raw.parse()?);
        }
        Ok(layer)
    }

    pub fn is_empty(&self) -> bool {
        *self == ConfigFile::default()
    }
}

fn parse_flag(key: &str, raw: &str) -> ConfigResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.into(),
            value: raw.into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.model, "openai/gpt-4o");
        assert_eq!(config.temperature, 0.7);
        assert!(config.enable_tools);
        assert_eq!(config.tool_execution, ToolExecution::Sequential);
        let channels = config.active_channels();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].0, "pandapower");
        assert_eq!(channels[0].1.target(), "gridagent serve");
        assert_eq!(channels[0].1.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_env_overlay() {
        let mut config = AgentConfig::default();
        config
            .apply_env(env(&[
                ("CHAT_MODEL", "anthropic/claude-sonnet-4"),
                ("TEMPERATURE", "0.2"),
                ("ENABLE_MCP", "false"),
                ("GRIDAGENT_TOOL_EXECUTION", "concurrent"),
            ]))
            .unwrap();
        assert_eq!(config.model, "anthropic/claude-sonnet-4");
        assert_eq!(config.temperature, 0.2);
        assert!(!config.enable_tools);
        assert_eq!(config.tool_execution, ToolExecution::Concurrent);
        assert!(config.active_channels().is_empty());
    }

    #[test]
    fn test_env_rejects_bad_values() {
        let err = ConfigFile::from_env(env(&[("TEMPERATURE", "warm")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert!(ConfigFile::from_env(env(&[("ENABLE_MCP", "maybe")])).is_err());
        assert!(ConfigFile::from_env(env(&[])).unwrap().is_empty());
    }

    #[test]
    fn test_merge_channels_by_name() {
        let mut config = AgentConfig::default();
        let mut layer = ConfigFile::default();
        layer
            .mcp_servers
            .insert("pandapower".into(), ChannelConfig::bundled().disabled());
        layer
            .mcp_servers
            .insert("remote".into(), ChannelConfig::http("http://localhost:8000/mcp"));
        config.merge(&layer);

        assert_eq!(config.mcp_servers.len(), 2);
        let active = config.active_channels();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].0, "remote");
    }

    #[test]
    fn test_channel_yaml_shape() {
        let yaml = r#"
model: openai/gpt-4o-mini
mcp_servers:
  pandapower:
    transport: stdio
    command: python
    args: ["-m", "pandapower_server"]
    cwd: /srv/grid
    env:
      PYTHONUNBUFFERED: "1"
  remote:
    transport: http
    url: http://localhost:8000/mcp
    timeout_secs: 30
"#;
        let layer: ConfigFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(layer.model.as_deref(), Some("openai/gpt-4o-mini"));
        let stdio = &layer.mcp_servers["pandapower"];
        assert_eq!(stdio.timeout_secs, 120);
        match &stdio.transport {
            ChannelTransport::Stdio { command, args, cwd, env } => {
                assert_eq!(command, "python");
                assert_eq!(args.len(), 2);
                assert_eq!(cwd.as_deref(), Some(std::path::Path::new("/srv/grid")));
                assert_eq!(env["PYTHONUNBUFFERED"], "1");
            }
            other => panic!("unexpected transport {:?}", other),
        }
        assert_eq!(layer.mcp_servers["remote"].timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_validate() {
        assert!(AgentConfig::default().validate().is_ok());
        assert!(AgentConfig::default().with_model(" ").validate().is_err());
        assert!(AgentConfig::default().with_temperature(-1.0).validate().is_err());
        let mut config = AgentConfig::default();
        if let Some(c) = config.mcp_servers.get_mut("pandapower") {
            c.timeout_secs = 0;
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tool_execution_parse() {
        assert_eq!("Sequential".parse::<ToolExecution>().unwrap(), ToolExecution::Sequential);
        assert_eq!("parallel".parse::<ToolExecution>().unwrap(), ToolExecution::Concurrent);
        assert!("eventually".parse::<ToolExecution>().is_err());
    }
}
