//! In-memory credential storage.

use std::sync::RwLock;

use async_trait::async_trait;
use forge_client_core::{TokenStore, TokenStoreError};

/// In-memory token store.
///
/// Useful for tests and ephemeral sessions. The credential is lost on
/// process exit.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn current(&self) -> Option<String> {
        self.token.read().unwrap().clone()
    }

    async fn set(&self, token: Option<String>) -> Result<(), TokenStoreError> {
        *self.token.write().unwrap() = token;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_clear() {
        let store = MemoryTokenStore::new();
        assert!(store.current().await.is_none());

        store.set(Some("tok".to_string())).await.unwrap();
        assert_eq!(store.current().await.as_deref(), Some("tok"));

        store.set(None).await.unwrap();
        assert!(store.current().await.is_none());
    }
}
