//! The chat agent: system prompt, tool binding and the two-pass turn

mod blocking;
mod orchestrator;
mod prompt;

pub use blocking::BlockingAgent;
pub use orchestrator::{AgentError, AgentResult, ChatAgent, Conversation, TurnOutcome};
pub use prompt::system_prompt;
