//! GenaiProvider - model access through the genai crate

use async_trait::async_trait;
use std::sync::Arc;

use genai::chat::ChatRequest;

use crate::logging::Logger;
use crate::secrets::{EnvSecretStore, SecretStore};
use crate::types::ChatMessage;

use super::error::{ProviderError, ProviderResult};
use super::genai_adapter::{
    create_client, from_genai_response, is_genai_supported, to_genai_messages, to_genai_options,
    to_genai_tool, ProviderConfig,
};
use super::traits::{ChatOptions, ChatResponse, Provider, ProviderModelConfig};

/// Provider for every backend genai supports
pub struct GenaiProvider {
    provider_id: String,
    secrets: Arc<dyn SecretStore>,
    logger: Arc<dyn Logger>,
}

impl GenaiProvider {
    pub fn new(provider_id: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self {
            provider_id: provider_id.into(),
            secrets: Arc::new(EnvSecretStore::new()),
            logger,
        }
    }

    pub fn with_secrets(mut self, secrets: Arc<dyn SecretStore>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn supports(provider_id: &str) -> bool {
        is_genai_supported(provider_id)
    }

    /// "openai/gpt-4o" -> "gpt-4o"
    pub fn extract_model_name(model: &str) -> &str {
        model.split_once('/').map_or(model, |(_, name)| name)
    }
}

#[async_trait]
impl Provider for GenaiProvider {
    fn name(&self) -> &str {
        &self.provider_id
    }

    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        model_config: ProviderModelConfig,
        options: ChatOptions,
    ) -> ProviderResult<ChatResponse> {
        let mut config = ProviderConfig::from(&model_config);
        if config.provider.is_empty() {
            config.provider = self.provider_id.clone();
        }
        let client = create_client(&config, Arc::clone(&self.secrets));

        let mut request = ChatRequest::new(to_genai_messages(messages)?);
        if !options.tools.is_empty() {
            request = request.with_tools(options.tools.iter().map(to_genai_tool).collect::<Vec<_>>());
        }
        let genai_options = to_genai_options(&options);
        let model_name = Self::extract_model_name(&model_config.model);

        self.logger.debug(&format!(
            "[GenaiProvider] chat: provider={}, model={}, tools={}",
            config.provider,
            model_name,
            options.tools.len()
        ));

        let response = client
            .exec_chat(model_name, request, Some(&genai_options))
            .await
            .map_err(|e| {
                self.logger
                    .error(&format!("[GenaiProvider] Request failed: {}", e));
                ProviderError::api_error(&config.provider, e.to_string())
            })?;

        let response = from_genai_response(response);
        self.logger.debug(&format!(
            "[GenaiProvider] Response: {} chars, {} tool calls",
            response.content.as_deref().map_or(0, str::len),
            response.tool_calls.len()
        ));
        Ok(response)
    }
}
