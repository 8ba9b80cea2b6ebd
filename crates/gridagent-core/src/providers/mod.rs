//! Language model providers
//!
//! Real traffic goes through `GenaiProvider`, which covers every backend the
//! `genai` crate speaks natively plus OpenAI-compatible endpoints routed by a
//! `ServiceTargetResolver`. `MockProvider` serves tests and offline runs.

mod error;
mod genai_adapter;
mod genai_provider;
mod mock;
mod traits;

pub use error::{ProviderError, ProviderResult};
pub use genai_adapter::{is_genai_native, is_genai_supported, ProviderConfig};
pub use genai_provider::GenaiProvider;
pub use mock::{MockMode, MockProvider, RecordedRequest};
pub use traits::{ChatOptions, ChatResponse, Provider, ProviderModelConfig};

use crate::logging::Logger;
use std::sync::Arc;

/// Pick a provider for a model string such as `openai/gpt-4o` or `mock/echo`
pub fn create_provider(model: &str, logger: Arc<dyn Logger>) -> Box<dyn Provider> {
    let provider_id = model.split_once('/').map_or("openai", |(p, _)| p);
    match provider_id.to_lowercase().as_str() {
        "mock" => Box::new(MockProvider::echo(logger)),
        // Unknown prefixes are tried as OpenAI-compatible endpoints
        _ => Box::new(GenaiProvider::new(provider_id, logger)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    #[test]
    fn test_create_provider() {
        assert_eq!(create_provider("mock/echo", Arc::new(NoOpLogger)).name(), "mock");
        assert_eq!(create_provider("anthropic/claude", Arc::new(NoOpLogger)).name(), "anthropic");
        assert_eq!(create_provider("gpt-4o", Arc::new(NoOpLogger)).name(), "openai");
    }
}
