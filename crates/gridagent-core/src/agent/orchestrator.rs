//! The chat turn: bind tools, ask the model, run the tools it asks for,
//! ask again with the results
//!
//! ```text
//! history ──► model (pass 1) ──► no tool calls ──────────────► answer
//!                   │
//!                   └─ tool calls ─► transport ─► tool results
//!                                                     │
//!                                  model (pass 2) ◄───┘ ─────► answer
//! ```
//!
//! Tool failures are folded into the conversation as tool results; only a
//! failing model request ends a turn with an error.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::join_all;
use thiserror::Error;

use super::prompt::{system_prompt, today};
use crate::config::{AgentConfig, ToolExecution};
use crate::logging::Logger;
use crate::mcp::ToolTransport;
use crate::providers::{create_provider, ChatOptions, Provider, ProviderError, ProviderModelConfig};
use crate::types::{ChatMessage, ToolCall, ToolDescriptor, ToolResult};
use crate::{log_debug, log_info, log_warn};

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Model request failed: {0}")]
    Model(#[from] ProviderError),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// What one turn produced
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The assistant message shown to the user
    pub final_message: ChatMessage,
    /// Messages to append to the history, in order; ends with `final_message`
    pub messages: Vec<ChatMessage>,
    /// Tool results in the order the model requested the calls
    pub tool_results: Vec<ToolResult>,
    /// Number of model requests made (1 or 2)
    pub model_calls: usize,
}

impl TurnOutcome {
    pub fn reply(&self) -> String {
        self.final_message.text().unwrap_or_default()
    }
}

/// Tools bound for one turn, looked up by exact name
struct Bindings {
    tools: Vec<ToolDescriptor>,
    by_name: HashMap<String, usize>,
}

impl Bindings {
    fn new(tools: Vec<ToolDescriptor>) -> Self {
        let by_name = tools
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
        Self { tools, by_name }
    }

    fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }
}

pub struct ChatAgent {
    provider: Arc<dyn Provider>,
    transport: Arc<ToolTransport>,
    config: AgentConfig,
    date: Option<NaiveDate>,
    logger: Arc<dyn Logger>,
}

impl ChatAgent {
    pub fn new(
        provider: Arc<dyn Provider>,
        transport: Arc<ToolTransport>,
        config: AgentConfig,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            provider,
            transport,
            config,
            date: None,
            logger,
        }
    }

    /// Provider picked from the model name, one remote channel per
    /// configured tool server
    pub fn from_config(config: AgentConfig, logger: Arc<dyn Logger>) -> Self {
        let provider: Arc<dyn Provider> =
            Arc::from(create_provider(&config.model, Arc::clone(&logger)));
        let transport = Arc::new(ToolTransport::from_config(&config, Arc::clone(&logger)));
        Self::new(provider, transport, config, logger)
    }

    /// Pin the date used in the system prompt
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<ToolTransport> {
        &self.transport
    }

    fn model(&self) -> ProviderModelConfig {
        ProviderModelConfig::new(&self.config.model)
    }

    fn options(&self, bindings: &Bindings) -> ChatOptions {
        ChatOptions::new()
            .with_temperature(self.config.temperature)
            .with_tools(bindings.tools.clone())
    }

    async fn bind(&self) -> Bindings {
        let tools = if self.config.enable_tools {
            self.transport.list_tools().await
        } else {
            Vec::new()
        };
        if !tools.is_empty() {
            log_debug!(self.logger, "[ChatAgent] Bound {} tools", tools.len());
        }
        Bindings::new(tools)
    }

    /// Run one user turn over `history` (which ends with the user message)
    pub async fn run_turn(&self, history: &[ChatMessage]) -> AgentResult<TurnOutcome> {
        let bindings = self.bind().await;
        let date = self.date.unwrap_or_else(today);

        let mut request = Vec::with_capacity(history.len() + 1);
        request.push(ChatMessage::system(system_prompt(date, &bindings.tools)));
        request.extend_from_slice(history);

        let first = self
            .provider
            .chat(request.clone(), self.model(), self.options(&bindings))
            .await?;

        if !first.has_tool_calls() {
            let final_message = ChatMessage::assistant(first.content.unwrap_or_default());
            return Ok(TurnOutcome {
                messages: vec![final_message.clone()],
                final_message,
                tool_results: Vec::new(),
                model_calls: 1,
            });
        }

        let calls = with_call_ids(first.tool_calls);
        log_info!(
            self.logger,
            "[ChatAgent] Executing {} tool call(s) ({})",
            calls.len(),
            self.config.tool_execution.as_str()
        );
        let tool_results = self.execute(&calls, &bindings).await;

        let mut appended = Vec::with_capacity(calls.len() + 2);
        appended.push(ChatMessage::assistant_tool_calls(
            first.content.as_deref(),
            &calls,
        ));
        appended.extend(tool_results.iter().map(ChatMessage::tool_result));
        request.extend(appended.iter().cloned());

        let second = self
            .provider
            .chat(request, self.model(), self.options(&bindings))
            .await?;
        if second.has_tool_calls() {
            log_warn!(
                self.logger,
                "[ChatAgent] Ignoring {} tool call(s) requested after tool results",
                second.tool_calls.len()
            );
        }

        let final_message = ChatMessage::assistant(second.content.unwrap_or_default());
        appended.push(final_message.clone());
        Ok(TurnOutcome {
            final_message,
            messages: appended,
            tool_results,
            model_calls: 2,
        })
    }

    async fn execute(&self, calls: &[ToolCall], bindings: &Bindings) -> Vec<ToolResult> {
        match self.config.tool_execution {
            ToolExecution::Sequential => {
                let mut results = Vec::with_capacity(calls.len());
                for call in calls {
                    results.push(self.execute_one(call, bindings).await);
                }
                results
            }
            ToolExecution::Concurrent => {
                join_all(calls.iter().map(|call| self.execute_one(call, bindings))).await
            }
        }
    }

    async fn execute_one(&self, call: &ToolCall, bindings: &Bindings) -> ToolResult {
        if !bindings.contains(&call.name) {
            log_warn!(self.logger, "[ChatAgent] Tool '{}' not found", call.name);
            return ToolResult::failure(
                &call.id,
                &call.name,
                format!("Tool '{}' not found", call.name),
            );
        }
        let result = self.transport.invoke(call).await;
        if result.is_failure() {
            log_warn!(self.logger, "[ChatAgent] Tool '{}' failed", call.name);
        } else {
            log_info!(self.logger, "[ChatAgent] Tool '{}' executed successfully", call.name);
        }
        result
    }
}

/// Give every call an id so results can be matched to it
fn with_call_ids(calls: Vec<ToolCall>) -> Vec<ToolCall> {
    calls
        .into_iter()
        .enumerate()
        .map(|(i, mut call)| {
            if call.id.is_empty() {
                call.id = format!("call_{}_{}", i, call.name);
            }
            call
        })
        .collect()
}

/// A running conversation: history plus the agent that extends it
pub struct Conversation {
    agent: ChatAgent,
    history: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(agent: ChatAgent) -> Self {
        Self {
            agent,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn agent(&self) -> &ChatAgent {
        &self.agent
    }

    /// Send a user message; the history only grows when the turn succeeds
    pub async fn send(&mut self, text: &str) -> AgentResult<TurnOutcome> {
        self.history.push(ChatMessage::user(text));
        match self.agent.run_turn(&self.history).await {
            Ok(outcome) => {
                self.history.extend(outcome.messages.iter().cloned());
                Ok(outcome)
            }
            Err(e) => {
                self.history.pop();
                Err(e)
            }
        }
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::AnalysisSession;
    use crate::logging::NoOpLogger;
    use crate::mcp::{LocalChannel, ToolChannel};
    use crate::providers::{ChatResponse, MockProvider};
    use crate::tools::PowerToolRegistry;
    use crate::types::{MessageRole, ToolOutput};
    use serde_json::json;

    fn logger() -> Arc<dyn Logger> {
        Arc::new(NoOpLogger::new())
    }

    fn local_transport() -> Arc<ToolTransport> {
        let registry = PowerToolRegistry::new(AnalysisSession::new(), logger());
        let channel: Arc<dyn ToolChannel> = Arc::new(LocalChannel::new("local", Arc::new(registry)));
        Arc::new(ToolTransport::with_channels(vec![channel], logger()))
    }

    fn agent(provider: Arc<MockProvider>, config: AgentConfig) -> ChatAgent {
        ChatAgent::new(provider, local_transport(), config, logger())
            .with_date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
    }

    #[tokio::test]
    async fn test_plain_answer_is_one_pass() {
        let provider = Arc::new(MockProvider::scripted(
            vec![ChatResponse::text("Hello")],
            logger(),
        ));
        let outcome = agent(Arc::clone(&provider), AgentConfig::default())
            .run_turn(&[ChatMessage::user("hi")])
            .await
            .unwrap();
        assert_eq!(outcome.reply(), "Hello");
        assert_eq!(outcome.model_calls, 1);
        assert_eq!(outcome.messages.len(), 1);

        let requests = provider.requests();
        assert_eq!(requests[0].tools.len(), 6);
        assert_eq!(requests[0].messages[0].role, MessageRole::System);
        assert!(requests[0].messages[0].text().unwrap_or_default().contains("load_network"));
    }

    #[tokio::test]
    async fn test_tools_disabled_binds_nothing() {
        let provider = Arc::new(MockProvider::scripted(vec![ChatResponse::text("ok")], logger()));
        agent(Arc::clone(&provider), AgentConfig::default().without_tools())
            .run_turn(&[ChatMessage::user("hi")])
            .await
            .unwrap();
        let request = &provider.requests()[0];
        assert!(request.tools.is_empty());
        assert!(!request.messages[0].text().unwrap_or_default().contains("CRITICAL"));
    }

    #[tokio::test]
    async fn test_unknown_tool_and_order() {
        let provider = Arc::new(MockProvider::scripted(
            vec![
                ChatResponse::tool_calls(vec![
                    ToolCall::new("a", "run_short_circuit", json!({})),
                    ToolCall::new("b", "create_empty_network", json!({})),
                    ToolCall::new("", "get_network_info", json!({})),
                ]),
                ChatResponse::text("done"),
            ],
            logger(),
        ));
        let config = AgentConfig::default().with_tool_execution(ToolExecution::Concurrent);
        let outcome = agent(Arc::clone(&provider), config)
            .run_turn(&[ChatMessage::user("go")])
            .await
            .unwrap();

        assert_eq!(outcome.model_calls, 2);
        let ids: Vec<&str> = outcome.tool_results.iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "call_2_get_network_info"]);
        assert_eq!(
            outcome.tool_results[0].output,
            ToolOutput::Failure("Tool 'run_short_circuit' not found".into())
        );
        assert!(!outcome.tool_results[1].is_failure());
        // assistant tool-call message, three results, final answer
        assert_eq!(outcome.messages.len(), 5);
        assert_eq!(outcome.messages[1].role, MessageRole::Tool);

        let second = &provider.requests()[1];
        assert_eq!(second.messages.len(), 2 + 4);
    }

    #[tokio::test]
    async fn test_second_pass_tool_calls_are_ignored() {
        let provider = Arc::new(MockProvider::scripted(
            vec![
                ChatResponse::tool_calls(vec![ToolCall::new("a", "create_empty_network", json!({}))]),
                ChatResponse {
                    content: Some("partial".into()),
                    tool_calls: vec![ToolCall::new("b", "get_network_info", json!({}))],
                },
            ],
            logger(),
        ));
        let outcome = agent(Arc::clone(&provider), AgentConfig::default())
            .run_turn(&[ChatMessage::user("go")])
            .await
            .unwrap();
        assert_eq!(outcome.reply(), "partial");
        assert_eq!(outcome.tool_results.len(), 1);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_model_failure_is_fatal() {
        let provider = Arc::new(MockProvider::error("rate limited", logger()));
        let err = agent(provider, AgentConfig::default())
            .run_turn(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Model(_)));

        // second pass failure: script runs out after the tool calls
        let provider = Arc::new(MockProvider::scripted(
            vec![ChatResponse::tool_calls(vec![ToolCall::new(
                "a",
                "create_empty_network",
                json!({}),
            )])],
            logger(),
        ));
        let result = agent(provider, AgentConfig::default())
            .run_turn(&[ChatMessage::user("hi")])
            .await;
        assert!(matches!(result, Err(AgentError::Model(ProviderError::ScriptExhausted(1)))));
    }

    #[tokio::test]
    async fn test_conversation_keeps_history() {
        let provider = Arc::new(MockProvider::echo(logger()));
        let mut conversation = Conversation::new(agent(provider, AgentConfig::default()));
        let outcome = conversation.send("first").await.unwrap();
        assert_eq!(outcome.reply(), "first");
        conversation.send("second").await.unwrap();
        assert_eq!(conversation.history().len(), 4);

        conversation.clear();
        assert!(conversation.history().is_empty());
    }
}
