//! Conversions between gridagent types and genai types, plus client setup
//!
//! API keys are looked up through the injected `SecretStore`, never through
//! genai's own environment lookup.

use std::sync::Arc;

use genai::chat::{
    ChatMessage as GenaiMessage, ChatOptions as GenaiOptions, ChatResponse as GenaiResponse,
    Tool as GenaiTool, ToolCall as GenaiToolCall, ToolResponse as GenaiToolResponse,
};
use genai::resolver::{AuthData, AuthResolver, Endpoint, ServiceTargetResolver};
use genai::{adapter::AdapterKind, Client, ModelIden, ServiceTarget};
use serde_json::json;

use crate::secrets::SecretStore;
use crate::types::{ChatMessage, ContentPart, MessageContent, MessageRole, ToolCall, ToolDescriptor};

use super::error::ProviderResult;
use super::traits::{ChatOptions, ChatResponse, ProviderModelConfig};

// ============================================================================
// Messages: gridagent -> genai
// ============================================================================

fn genai_tool_call(call: &ToolCall) -> ProviderResult<GenaiToolCall> {
    // Built through serde so optional provider-specific fields default
    Ok(serde_json::from_value(json!({
        "call_id": call.id,
        "fn_name": call.name,
        "fn_arguments": call.input,
    }))?)
}

/// Convert one message; assistant messages with tool calls and tool messages
/// with several results expand into more than one genai message.
pub fn to_genai_message(msg: ChatMessage) -> ProviderResult<Vec<GenaiMessage>> {
    let parts = match msg.content {
        MessageContent::Text(text) => {
            let single = match msg.role {
                MessageRole::System => GenaiMessage::system(text),
                MessageRole::User => GenaiMessage::user(text),
                MessageRole::Assistant => GenaiMessage::assistant(text),
                // A bare tool message without a call id cannot be routed
                MessageRole::Tool => GenaiMessage::user(text),
            };
            return Ok(vec![single]);
        }
        MessageContent::Parts(parts) => parts,
    };

    let mut out = Vec::new();
    let mut text = Vec::new();
    let mut calls = Vec::new();
    for part in parts {
        match part {
            ContentPart::Text { text: t } => text.push(t),
            ContentPart::ToolUse { id, name, input } => {
                calls.push(genai_tool_call(&ToolCall::new(id, name, input))?)
            }
            ContentPart::ToolResult {
                tool_use_id,
                content,
            } => out.push(GenaiMessage::from(GenaiToolResponse::new(tool_use_id, content))),
        }
    }

    let mut head = Vec::new();
    if !text.is_empty() {
        let joined = text.join("\n");
        head.push(match msg.role {
            MessageRole::System => GenaiMessage::system(joined),
            MessageRole::Assistant => GenaiMessage::assistant(joined),
            MessageRole::User | MessageRole::Tool => GenaiMessage::user(joined),
        });
    }
    if !calls.is_empty() {
        head.push(GenaiMessage::from(calls));
    }
    head.extend(out);
    Ok(head)
}

pub fn to_genai_messages(messages: Vec<ChatMessage>) -> ProviderResult<Vec<GenaiMessage>> {
    let mut out = Vec::with_capacity(messages.len());
    for msg in messages {
        out.extend(to_genai_message(msg)?);
    }
    Ok(out)
}

pub fn to_genai_tool(tool: &ToolDescriptor) -> GenaiTool {
    GenaiTool::new(&tool.name)
        .with_description(&tool.description)
        .with_schema(tool.input_schema.clone())
}

pub fn to_genai_options(options: &ChatOptions) -> GenaiOptions {
    let mut genai_opts = GenaiOptions::default();
    if let Some(temp) = options.temperature {
        genai_opts = genai_opts.with_temperature(temp as f64);
    }
    if let Some(max_tokens) = options.max_tokens {
        genai_opts = genai_opts.with_max_tokens(max_tokens);
    }
    genai_opts
}

// ============================================================================
// Responses: genai -> gridagent
// ============================================================================

pub fn from_genai_tool_call(tc: GenaiToolCall) -> ToolCall {
    ToolCall::new(tc.call_id, tc.fn_name, tc.fn_arguments)
}

pub fn from_genai_response(response: GenaiResponse) -> ChatResponse {
    let content = response
        .first_text()
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let tool_calls = response
        .into_tool_calls()
        .into_iter()
        .map(from_genai_tool_call)
        .collect();
    ChatResponse {
        content,
        tool_calls,
    }
}

// ============================================================================
// Client
// ============================================================================

/// Provider routing for one request
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider identifier (e.g., "openai", "openrouter")
    pub provider: String,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
}

impl From<&ProviderModelConfig> for ProviderConfig {
    fn from(config: &ProviderModelConfig) -> Self {
        let provider = match config.model.split_once('/') {
            Some((provider, _)) => provider.to_string(),
            None => String::new(),
        };
        Self {
            provider,
            api_key: config.api_key.clone(),
            api_base: config.api_base.clone(),
        }
    }
}

/// Secret store key for an adapter when the model string names no provider
fn adapter_secret_key(adapter: AdapterKind) -> String {
    format!("{:?}", adapter).to_lowercase()
}

/// Create a genai client that resolves auth through `secrets` and routes
/// OpenAI-compatible providers to their endpoints
pub fn create_client(config: &ProviderConfig, secrets: Arc<dyn SecretStore>) -> Client {
    let auth_provider = config.provider.clone();
    let explicit_key = config.api_key.clone();

    let auth_resolver = AuthResolver::from_resolver_fn(
        move |model_iden: ModelIden| -> Result<Option<AuthData>, genai::resolver::Error> {
            if let Some(key) = &explicit_key {
                return Ok(Some(AuthData::from_single(key.clone())));
            }
            let secret_key = if auth_provider.is_empty() {
                adapter_secret_key(model_iden.adapter_kind)
            } else {
                auth_provider.clone()
            };
            // Providers such as ollama need no key
            Ok(secrets.get(&secret_key).map(AuthData::from_single))
        },
    );

    let target_provider = config.provider.clone();
    let target_api_base = config.api_base.clone();

    let target_resolver = ServiceTargetResolver::from_resolver_fn(
        move |target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let (endpoint, adapter_kind) = match (target_provider.as_str(), &target_api_base) {
                (_, Some(base)) if !is_genai_native(&target_provider) => {
                    (Endpoint::from_owned(base.clone()), AdapterKind::OpenAI)
                }
                (_, Some(base)) => (Endpoint::from_owned(base.clone()), target.model.adapter_kind),
                ("openrouter", None) => (
                    Endpoint::from_static("https://openrouter.ai/api/v1/"),
                    AdapterKind::OpenAI,
                ),
                ("mistral", None) => (
                    Endpoint::from_static("https://api.mistral.ai/v1/"),
                    AdapterKind::OpenAI,
                ),
                _ => return Ok(target),
            };

            Ok(ServiceTarget {
                endpoint,
                auth: target.auth,
                model: ModelIden::new(adapter_kind, target.model.model_name.clone()),
            })
        },
    );

    Client::builder()
        .with_auth_resolver(auth_resolver)
        .with_service_target_resolver(target_resolver)
        .build()
}

/// Providers genai speaks natively
pub fn is_genai_native(provider: &str) -> bool {
    matches!(
        provider.to_lowercase().as_str(),
        "openai"
            | "anthropic"
            | "gemini"
            | "ollama"
            | "groq"
            | "xai"
            | "deepseek"
            | "cohere"
            | "fireworks"
            | "together"
    )
}

/// Native providers plus the OpenAI-compatible ones routed above
pub fn is_genai_supported(provider: &str) -> bool {
    is_genai_native(provider)
        || matches!(provider.to_lowercase().as_str(), "openrouter" | "mistral")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolResult;
    use genai::chat::ChatRole as GenaiRole;

    #[test]
    fn test_plain_messages() {
        let msgs = to_genai_messages(vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("Hello"),
            ChatMessage::assistant("Hi"),
        ])
        .unwrap();
        assert_eq!(msgs.len(), 3);
        assert!(matches!(msgs[0].role, GenaiRole::System));
        assert!(matches!(msgs[1].role, GenaiRole::User));
        assert!(matches!(msgs[2].role, GenaiRole::Assistant));
    }

    #[test]
    fn test_tool_round_messages() {
        let calls = vec![ToolCall::new("c1", "get_network_info", json!({}))];
        let assistant = ChatMessage::assistant_tool_calls(Some("Checking."), &calls);
        let result = ChatMessage::tool_result(&ToolResult::success(
            "c1",
            "get_network_info",
            json!({"status": "success"}),
        ));

        let msgs = to_genai_messages(vec![assistant, result]).unwrap();
        assert_eq!(msgs.len(), 3);
        assert!(matches!(msgs[0].role, GenaiRole::Assistant));
        assert!(matches!(msgs[1].role, GenaiRole::Assistant));
        assert!(matches!(msgs[2].role, GenaiRole::Tool));
    }

    #[test]
    fn test_tool_conversion() {
        let tool = ToolDescriptor::new("load_network", "Load a network").with_schema(json!({
            "type": "object",
            "properties": { "file_path": { "type": "string" } }
        }));
        assert_eq!(to_genai_tool(&tool).name, "load_network");
    }

    #[test]
    fn test_provider_from_model() {
        let cfg = ProviderConfig::from(&ProviderModelConfig::new("openrouter/meta/llama"));
        assert_eq!(cfg.provider, "openrouter");
        let bare = ProviderConfig::from(&ProviderModelConfig::new("gpt-4o"));
        assert!(bare.provider.is_empty());

        assert!(is_genai_native("openai"));
        assert!(!is_genai_native("openrouter"));
        assert!(is_genai_supported("mistral"));
        assert!(!is_genai_supported("nowhere"));
    }
}
