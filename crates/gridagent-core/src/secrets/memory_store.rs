//! In-memory secret store

use std::collections::HashMap;

use parking_lot::RwLock;

use super::traits::{normalize_key, SecretStore, SecretStoreResult};

/// Read-write store kept in memory; used by tests and by callers that
/// receive keys from somewhere other than the environment
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(self, key: &str, value: impl Into<String>) -> Self {
        self.secrets.write().insert(normalize_key(key), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.secrets.read().get(&normalize_key(key)).cloned()
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        self.secrets
            .write()
            .insert(normalize_key(key), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> SecretStoreResult<()> {
        self.secrets.write().remove(&normalize_key(key));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_normalized() {
        let store = MemorySecretStore::new().with_secret("OPENAI_API_KEY", "sk-1");
        assert_eq!(store.get("openai").as_deref(), Some("sk-1"));
        assert_eq!(store.get("OpenAI").as_deref(), Some("sk-1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_and_delete() {
        let store = MemorySecretStore::new();
        assert!(store.is_empty());
        store.store("anthropic", "sk-2").unwrap();
        assert!(store.has("ANTHROPIC_API_KEY"));
        store.delete("anthropic").unwrap();
        assert!(!store.has("anthropic"));
    }
}
