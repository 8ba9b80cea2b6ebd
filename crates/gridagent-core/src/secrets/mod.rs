//! API key storage for model providers

mod env_store;
mod memory_store;
mod traits;

pub use env_store::EnvSecretStore;
pub use memory_store::MemorySecretStore;
pub use traits::{normalize_key, SecretStore, SecretStoreError, SecretStoreResult};
