//! GridAgent Core
//!
//! A chat agent for power system analysis. A language model answers the
//! user and, when it needs numbers, calls power system tools (load a
//! network, run an AC power flow, sweep N-1/N-2 contingencies) served over
//! MCP.
//!
//! ```text
//! agent::ChatAgent ──► providers::Provider (genai, mock)
//!        │
//!        └──► mcp::ToolTransport ──► channels ──► mcp::GridToolServer
//!                                                       │
//!                                   tools::PowerToolRegistry
//!                                                       │
//!                                         grid::AnalysisSession
//! ```
//!
//! ```rust,ignore
//! use gridagent_core::{agent::ChatAgent, config::load_config};
//!
//! let config = load_config(None, None, logger.as_ref()).await?;
//! let agent = ChatAgent::from_config(config, logger);
//! let outcome = agent.run_turn(&[ChatMessage::user("Solve the power flow of case9.json")]).await?;
//! println!("{}", outcome.reply());
//! ```

pub mod agent;
pub mod config;
pub mod grid;
pub mod logging;
pub mod mcp;
pub mod providers;
pub mod secrets;
pub mod tools;
pub mod types;

pub use types::{
    ChatMessage, ContentPart, MessageContent, MessageRole, ToolCall, ToolDescriptor, ToolOutput,
    ToolResult,
};

pub use agent::{AgentError, BlockingAgent, ChatAgent, Conversation, TurnOutcome};

pub use config::{AgentConfig, ChannelConfig, ConfigError, ConfigProvider, ToolExecution};

pub use grid::{AnalysisSession, GridError, Network, PowerFlowOptions, PowerFlowResults};

pub use logging::{ConsoleLogger, Logger, NoOpLogger};

pub use mcp::{GridToolServer, LocalChannel, McpError, ToolTransport};

pub use providers::{create_provider, Provider, ProviderError};

pub use secrets::{EnvSecretStore, MemorySecretStore, SecretStore};

pub use tools::PowerToolRegistry;
