use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{RedisConfig, StoreBackend};

pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Errors from the key-value session store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session store unavailable: {0}")]
    Unavailable(String),

    #[error("Session store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Minimal key-value contract the session layer needs.
///
/// Every operation is individually atomic on the backing store; multi-step
/// sequences built on top of it are not.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Backend name for logs and health output
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value`; `ttl_seconds` of `None` means no expiry
    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<(), StoreError>;

    /// Delete `key`, returning whether it existed
    async fn del(&self, key: &str) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

pub type SharedStore = Arc<dyn KeyValueStore>;

/// Strings are stored as-is, anything else as JSON text.
pub fn encode_value(value: &Value) -> Result<String, StoreError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Ok(serde_json::to_string(other)?),
    }
}

/// JSON-decode a stored value, falling back to the raw string.
pub fn decode_value(raw: String) -> Value {
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(_) => Value::String(raw),
    }
}

/// Store used when sessions are switched off or the backend is unreachable.
/// Reads always miss and writes are acknowledged without effect.
#[derive(Debug, Default, Clone)]
pub struct DisabledStore;

#[async_trait]
impl KeyValueStore for DisabledStore {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    async fn set(&self, key: &str, _value: &str, _ttl_seconds: Option<u64>) -> Result<(), StoreError> {
        tracing::warn!("Session store disabled, dropping write for {}", key);
        Ok(())
    }

    async fn del(&self, _key: &str) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("session store is disabled".to_string()))
    }
}

/// Build the configured store. An unreachable Redis degrades to `DisabledStore`
/// so the service keeps answering requests as unauthenticated.
pub async fn connect_store(config: &RedisConfig) -> SharedStore {
    match config.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory session store");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Disabled => {
            tracing::warn!("Session store disabled; every request will be unauthenticated");
            Arc::new(DisabledStore)
        }
        StoreBackend::Redis => match RedisStore::connect(&config.url()).await {
            Ok(store) => {
                tracing::info!("Connected to redis at {}:{}/{}", config.host, config.port, config.db);
                Arc::new(store)
            }
            Err(e) => {
                tracing::error!("Redis unavailable ({}), falling back to disabled session store", e);
                Arc::new(DisabledStore)
            }
        },
    }
}
