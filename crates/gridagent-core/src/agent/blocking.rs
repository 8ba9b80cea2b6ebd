//! Blocking facade over the async agent

use tokio::runtime::{Builder, Runtime};

use super::orchestrator::{AgentResult, ChatAgent, TurnOutcome};
use crate::types::{ChatMessage, ToolDescriptor};

/// Owns a multi-thread runtime and runs turns to completion on it
///
/// Must not be used from inside another tokio runtime.
pub struct BlockingAgent {
    runtime: Runtime,
    agent: ChatAgent,
}

impl BlockingAgent {
    pub fn new(agent: ChatAgent) -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .thread_name("gridagent")
            .build()?;
        Ok(Self { runtime, agent })
    }

    pub fn run_turn(&self, history: &[ChatMessage]) -> AgentResult<TurnOutcome> {
        self.runtime.block_on(self.agent.run_turn(history))
    }

    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.runtime.block_on(self.agent.transport().list_tools())
    }

    pub fn agent(&self) -> &ChatAgent {
        &self.agent
    }
}
