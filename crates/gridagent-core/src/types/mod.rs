//! Core types shared by providers, the tool transport and the agent loop

mod message;
mod tool;

pub use message::{ChatMessage, ContentPart, MessageContent, MessageRole};
pub use tool::{ToolCall, ToolDescriptor, ToolOutput, ToolResult};
