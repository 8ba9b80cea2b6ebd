//! Environment variable secret store

use std::collections::HashMap;
use std::env;

use once_cell::sync::Lazy;

use super::traits::{normalize_key, SecretStore, SecretStoreError, SecretStoreResult};

/// Providers whose key lives under a name other than `<PROVIDER>_API_KEY`
static ENV_VAR_MAP: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("gemini", vec!["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
    m.insert("google", vec!["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
    m.insert("azure", vec!["AZURE_API_KEY", "AZURE_OPENAI_API_KEY"]);
    m.insert("ollama", vec![]);
    m
});

fn non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.is_empty())
}

/// Read-only store over the process environment
///
/// `get("openai")` and `get("OPENAI_API_KEY")` both read `OPENAI_API_KEY`.
#[derive(Debug, Default)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn new() -> Self {
        Self
    }

    /// Variables checked for a provider, in order
    pub fn env_vars_for(provider: &str) -> Vec<String> {
        let key = normalize_key(provider);
        match ENV_VAR_MAP.get(key.as_str()) {
            Some(vars) => vars.iter().map(|v| v.to_string()).collect(),
            None => vec![format!("{}_API_KEY", key.to_uppercase())],
        }
    }
}

impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, key: &str) -> Option<String> {
        non_empty(key).or_else(|| Self::env_vars_for(key).iter().find_map(|v| non_empty(v)))
    }

    fn store(&self, _key: &str, _value: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }

    fn delete(&self, _key: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }
}
