//! Secret store trait and errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("Store is read-only")]
    ReadOnly,

    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Other(String),
}

pub type SecretStoreResult<T> = Result<T, SecretStoreError>;

/// Source of API keys for model providers
///
/// Keys are looked up by provider name (`openai`) or by a literal variable
/// name (`OPENAI_API_KEY`); each store decides how to map them.
pub trait SecretStore: Send + Sync {
    /// Human-readable name of this store
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> Option<String>;

    /// Returns `Err(SecretStoreError::ReadOnly)` if the store can't be written
    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()>;

    fn delete(&self, key: &str) -> SecretStoreResult<()>;

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Canonical form of a provider key: lowercase, without an `_api_key` suffix
pub fn normalize_key(key: &str) -> String {
    let lower = key.trim().to_lowercase();
    lower
        .strip_suffix("_api_key")
        .map(str::to_string)
        .unwrap_or(lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("OPENAI_API_KEY"), "openai");
        assert_eq!(normalize_key(" Anthropic "), "anthropic");
        assert_eq!(normalize_key("groq"), "groq");
    }
}
