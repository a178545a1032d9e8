use thiserror::Error;

use crate::config::{SessionConfig, DEFAULT_SESSION_TTL_SECONDS};
use crate::store::{decode_value, encode_value, SharedStore, StoreError};

use super::identity::SessionIdentity;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Session TTL must be at least one second")]
    InvalidTtl,
}

/// Issues, resolves, refreshes and destroys opaque session tokens.
///
/// Holds no session state of its own: every call goes back to the store.
#[derive(Clone)]
pub struct SessionManager {
    store: SharedStore,
    key_prefix: String,
    default_ttl: u64,
}

impl SessionManager {
    pub fn new(store: SharedStore, config: &SessionConfig) -> Self {
        Self {
            store,
            key_prefix: config.key_prefix.clone(),
            default_ttl: config.ttl_seconds,
        }
    }

    /// Manager with the stock `auth:token:` prefix and 7 day TTL
    pub fn with_defaults(store: SharedStore) -> Self {
        Self {
            store,
            key_prefix: "auth:token:".to_string(),
            default_ttl: DEFAULT_SESSION_TTL_SECONDS,
        }
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// 32 random bytes, hex-encoded
    pub fn generate_token() -> String {
        let bytes: [u8; 32] = rand::random();
        hex::encode(bytes)
    }

    fn key(&self, token: &str) -> String {
        format!("{}{}", self.key_prefix, token)
    }

    /// Zero is refused: Redis rejects `SETEX 0` and an in-memory record would be born expired
    async fn write(&self, token: &str, identity: &SessionIdentity, ttl_seconds: u64) -> Result<(), SessionError> {
        if ttl_seconds == 0 {
            return Err(SessionError::InvalidTtl);
        }
        let value = encode_value(&serde_json::to_value(identity).map_err(StoreError::from)?)?;
        self.store.set(&self.key(token), &value, Some(ttl_seconds)).await?;
        Ok(())
    }

    pub async fn create_session(&self, identity: &SessionIdentity) -> Result<String, SessionError> {
        self.create_session_with_ttl(identity, self.default_ttl).await
    }

    pub async fn create_session_with_ttl(
        &self,
        identity: &SessionIdentity,
        ttl_seconds: u64,
    ) -> Result<String, SessionError> {
        let token = Self::generate_token();
        self.write(&token, identity, ttl_seconds).await?;
        tracing::debug!("Created session for user {} ({}) ttl={}s", identity.id, identity.email, ttl_seconds);
        Ok(token)
    }

    /// Resolve a token to its identity; `None` if absent, expired or malformed
    pub async fn get_user_info(&self, token: &str) -> Result<Option<SessionIdentity>, SessionError> {
        let Some(raw) = self.store.get(&self.key(token)).await? else {
            return Ok(None);
        };

        match serde_json::from_value::<SessionIdentity>(decode_value(raw)) {
            Ok(identity) => Ok(Some(identity)),
            Err(e) => {
                tracing::warn!("Discarding malformed session record: {}", e);
                Ok(None)
            }
        }
    }

    /// Rewrite the stored identity with a fresh TTL.
    ///
    /// Read-then-write, not atomic: a destroy landing between the two steps
    /// is undone by the rewrite.
    pub async fn refresh_session(&self, token: &str, ttl_seconds: u64) -> Result<bool, SessionError> {
        let Some(identity) = self.get_user_info(token).await? else {
            return Ok(false);
        };
        self.write(token, &identity, ttl_seconds).await?;
        Ok(true)
    }

    pub async fn destroy_session(&self, token: &str) -> Result<bool, SessionError> {
        Ok(self.store.del(&self.key(token)).await?)
    }

    /// Store failures count as an invalid token
    pub async fn validate_token(&self, token: &str) -> bool {
        match self.get_user_info(token).await {
            Ok(identity) => identity.is_some(),
            Err(e) => {
                tracing::error!("Token validation failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyValueStore, MemoryStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Memory store that counts writes
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl KeyValueStore for CountingStore {
        fn name(&self) -> &'static str {
            "counting"
        }
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key).await
        }
        async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value, ttl).await
        }
        async fn del(&self, key: &str) -> Result<bool, StoreError> {
            self.inner.del(key).await
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl KeyValueStore for FailingStore {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
        async fn set(&self, _key: &str, _value: &str, _ttl: Option<u64>) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
        async fn del(&self, _key: &str) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    fn identity() -> SessionIdentity {
        SessionIdentity::new(42, "admin@example.com")
            .with_name("Admin")
            .with_roles(["admin"])
    }

    #[test]
    fn tokens_are_64_hex_chars_and_unique() {
        let a = SessionManager::generate_token();
        let b = SessionManager::generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn create_then_get_returns_same_identity() {
        let manager = SessionManager::with_defaults(Arc::new(MemoryStore::new()));
        let token = manager.create_session(&identity()).await.unwrap();
        assert_eq!(manager.get_user_info(&token).await.unwrap(), Some(identity()));
        assert!(manager.validate_token(&token).await);
    }

    #[tokio::test]
    async fn records_live_under_prefixed_key() {
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::with_defaults(store.clone());
        let token = manager.create_session(&identity()).await.unwrap();
        let raw = store.get(&format!("auth:token:{}", token)).await.unwrap();
        assert!(raw.unwrap().contains("admin@example.com"));
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let manager = SessionManager::with_defaults(Arc::new(MemoryStore::new()));
        let token = manager.create_session(&identity()).await.unwrap();
        assert!(manager.destroy_session(&token).await.unwrap());
        assert_eq!(manager.get_user_info(&token).await.unwrap(), None);
        assert!(!manager.destroy_session(&token).await.unwrap());
    }

    #[tokio::test]
    async fn refresh_missing_token_does_not_write() {
        let store = Arc::new(CountingStore::default());
        let manager = SessionManager::with_defaults(store.clone());
        assert!(!manager.refresh_session("missing", 60).await.unwrap());
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refresh_rewrites_with_new_ttl() {
        let store = Arc::new(CountingStore::default());
        let manager = SessionManager::with_defaults(store.clone());
        let token = manager.create_session(&identity()).await.unwrap();
        assert!(manager.refresh_session(&token, 60).await.unwrap());
        assert_eq!(store.writes.load(Ordering::SeqCst), 2);
        assert_eq!(manager.get_user_info(&token).await.unwrap(), Some(identity()));
    }

    #[tokio::test]
    async fn zero_ttl_is_refused_without_writing() {
        let store = Arc::new(CountingStore::default());
        let manager = SessionManager::with_defaults(store.clone());

        let created = manager.create_session_with_ttl(&identity(), 0).await;
        assert!(matches!(created, Err(SessionError::InvalidTtl)));

        let token = manager.create_session(&identity()).await.unwrap();
        let refreshed = manager.refresh_session(&token, 0).await;
        assert!(matches!(refreshed, Err(SessionError::InvalidTtl)));

        // only the valid create reached the store, and its record survives
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
        assert!(manager.validate_token(&token).await);
    }

    #[tokio::test]
    async fn malformed_record_reads_as_absent() {
        let store = Arc::new(MemoryStore::new());
        store.set("auth:token:bad", "just a string", None).await.unwrap();
        let manager = SessionManager::with_defaults(store);
        assert_eq!(manager.get_user_info("bad").await.unwrap(), None);
    }

    #[tokio::test]
    async fn store_outage_propagates_except_validate() {
        let manager = SessionManager::with_defaults(Arc::new(FailingStore));
        assert!(manager.create_session(&identity()).await.is_err());
        assert!(manager.get_user_info("t").await.is_err());
        assert!(!manager.validate_token("t").await);
    }
}
