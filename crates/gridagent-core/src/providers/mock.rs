//! Mock provider for testing
//!
//! Deterministic responses without network access. A scripted mock hands out
//! queued responses in order and records every request it receives, which is
//! what the agent loop tests assert against.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use super::error::{ProviderError, ProviderResult};
use super::traits::{ChatOptions, ChatResponse, Provider, ProviderModelConfig};
use crate::logging::Logger;
use crate::types::{ChatMessage, MessageRole};

/// Mock response mode
#[derive(Debug, Clone, Default)]
pub enum MockMode {
    /// Echo back the last user message
    #[default]
    Echo,
    /// Pop the next scripted response
    Script,
    /// Fail every request
    Error(String),
}

/// A request as seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    /// Names of the tools bound to the request
    pub tools: Vec<String>,
}

pub struct MockProvider {
    mode: MockMode,
    script: Mutex<VecDeque<ChatResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
    logger: Arc<dyn Logger>,
}

impl MockProvider {
    fn with_mode(mode: MockMode, script: Vec<ChatResponse>, logger: Arc<dyn Logger>) -> Self {
        Self {
            mode,
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            logger,
        }
    }

    pub fn echo(logger: Arc<dyn Logger>) -> Self {
        Self::with_mode(MockMode::Echo, Vec::new(), logger)
    }

    /// Answer with `responses` in order; further requests fail
    pub fn scripted(responses: Vec<ChatResponse>, logger: Arc<dyn Logger>) -> Self {
        Self::with_mode(MockMode::Script, responses, logger)
    }

    pub fn error(message: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self::with_mode(MockMode::Error(message.into()), Vec::new(), logger)
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn echo_reply(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .and_then(|m| m.text())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        model: ProviderModelConfig,
        options: ChatOptions,
    ) -> ProviderResult<ChatResponse> {
        let seen = {
            let mut requests = self.requests.lock();
            requests.push(RecordedRequest {
                messages: messages.clone(),
                model: model.model,
                tools: options.tools.iter().map(|t| t.name.clone()).collect(),
            });
            requests.len()
        };
        self.logger
            .debug(&format!("[MockProvider] Request #{} ({} messages)", seen, messages.len()));

        match &self.mode {
            MockMode::Echo => Ok(ChatResponse::text(Self::echo_reply(&messages))),
            MockMode::Script => self
                .script
                .lock()
                .pop_front()
                .ok_or(ProviderError::ScriptExhausted(seen - 1)),
            MockMode::Error(message) => Err(ProviderError::api_error("mock", message.clone())),
        }
    }
}
