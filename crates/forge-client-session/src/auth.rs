//! Authentication session: login, register, logout, startup restore.

use std::sync::{Arc, RwLock};

use forge_client_core::{AgentApi, ApiError, TokenStore, TokenStoreError, User};

/// Auth operation failure, carrying the most specific message available.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    TokenStore(#[from] TokenStoreError),
}

/// Holds the current-user identity, derived solely from token validity.
///
/// Identity is present if and only if the last identity fetch with the
/// current credential succeeded.
pub struct AuthManager<A: AgentApi + ?Sized> {
    api: Arc<A>,
    tokens: Arc<dyn TokenStore>,
    user: RwLock<Option<User>>,
}

impl<A: AgentApi + ?Sized> AuthManager<A> {
    #[must_use]
    pub fn new(api: Arc<A>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            api,
            tokens,
            user: RwLock::new(None),
        }
    }

    /// Currently authenticated user, if any.
    #[must_use]
    pub fn current(&self) -> Option<User> {
        self.user.read().unwrap().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.read().unwrap().is_some()
    }

    /// Log in and establish a session.
    ///
    /// Stores the returned credential, then fetches the identity behind
    /// it; succeeds only if both steps do. A rejected login leaves the
    /// token store untouched.
    ///
    /// # Errors
    /// Returns the login or identity-fetch failure.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let token = self.api.login(email, password).await?;
        self.tokens.set(Some(token.access_token)).await?;

        match self.api.current_user().await {
            Ok(user) => {
                *self.user.write().unwrap() = Some(user.clone());
                Ok(user)
            }
            Err(e) => {
                *self.user.write().unwrap() = None;
                Err(e.into())
            }
        }
    }

    /// Register a new account, then log in with the same credentials.
    ///
    /// Registration itself does not establish a session.
    ///
    /// # Errors
    /// Returns the registration or login failure.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.api.register(email, password).await?;
        self.login(email, password).await
    }

    /// Clear identity and credential. No network effect.
    ///
    /// # Errors
    /// Returns an error if the persisted credential cannot be removed.
    pub async fn logout(&self) -> Result<(), TokenStoreError> {
        *self.user.write().unwrap() = None;
        self.tokens.set(None).await
    }

    /// Restore a session from a persisted credential at startup.
    ///
    /// Fetches the identity once; on failure the credential is
    /// discarded and identity stays absent, with no retry.
    ///
    /// # Errors
    /// Returns an error only if discarding a stale credential fails;
    /// a failed identity fetch itself is downgraded to `None`.
    pub async fn restore(&self) -> Result<Option<User>, TokenStoreError> {
        if self.tokens.current().await.is_none() {
            return Ok(None);
        }
        match self.api.current_user().await {
            Ok(user) => {
                *self.user.write().unwrap() = Some(user.clone());
                Ok(Some(user))
            }
            Err(e) => {
                tracing::debug!("persisted credential rejected: {e}");
                self.tokens.set(None).await?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use forge_client_core::{
        ExecuteResponse, ExecutionRequest, SessionId, SessionSummary, Token, UpdateStream,
    };

    use crate::storage::MemoryTokenStore;

    use super::*;

    fn sample_user(email: &str) -> User {
        User {
            id: 1,
            email: email.to_string(),
            is_active: true,
            is_superuser: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Auth-only fake: accepts one known email/password pair.
    struct FakeAuthApi {
        email: String,
        password: String,
        registered: Mutex<bool>,
        reject_me: Mutex<bool>,
    }

    impl FakeAuthApi {
        fn new(email: &str, password: &str) -> Self {
            Self {
                email: email.to_string(),
                password: password.to_string(),
                registered: Mutex::new(true),
                reject_me: Mutex::new(false),
            }
        }

        fn unregistered(email: &str, password: &str) -> Self {
            let api = Self::new(email, password);
            *api.registered.lock().unwrap() = false;
            api
        }
    }

    #[async_trait]
    impl AgentApi for FakeAuthApi {
        async fn login(&self, email: &str, password: &str) -> Result<Token, ApiError> {
            let known = *self.registered.lock().unwrap();
            if known && email == self.email && password == self.password {
                Ok(Token {
                    access_token: "tok-123".to_string(),
                    token_type: "bearer".to_string(),
                })
            } else {
                Err(ApiError::Status {
                    status: 401,
                    message: "invalid credentials".to_string(),
                })
            }
        }

        async fn register(&self, email: &str, password: &str) -> Result<(), ApiError> {
            if email == self.email && password == self.password {
                *self.registered.lock().unwrap() = true;
                Ok(())
            } else {
                Err(ApiError::Status {
                    status: 400,
                    message: "registration failed".to_string(),
                })
            }
        }

        async fn current_user(&self) -> Result<User, ApiError> {
            if *self.reject_me.lock().unwrap() {
                return Err(ApiError::Status {
                    status: 401,
                    message: "could not validate credentials".to_string(),
                });
            }
            Ok(sample_user(&self.email))
        }

        async fn list_sessions(
            &self,
            _skip: usize,
            _limit: usize,
        ) -> Result<Vec<SessionSummary>, ApiError> {
            Ok(Vec::new())
        }

        async fn execute_agent(
            &self,
            _request: &ExecutionRequest,
        ) -> Result<ExecuteResponse, ApiError> {
            unimplemented!("not exercised")
        }

        async fn open_execution_stream(
            &self,
            _session_id: SessionId,
        ) -> Result<UpdateStream, ApiError> {
            unimplemented!("not exercised")
        }
    }

    fn manager(api: FakeAuthApi) -> (AuthManager<FakeAuthApi>, Arc<MemoryTokenStore>) {
        let tokens = Arc::new(MemoryTokenStore::new());
        let manager = AuthManager::new(Arc::new(api), Arc::clone(&tokens) as Arc<dyn TokenStore>);
        (manager, tokens)
    }

    #[tokio::test]
    async fn test_login_stores_token_and_identity() {
        let (auth, tokens) = manager(FakeAuthApi::new("a@b.com", "pw"));

        let user = auth.login("a@b.com", "pw").await.unwrap();
        assert_eq!(user.email, "a@b.com");
        assert!(auth.is_authenticated());
        assert_eq!(tokens.current().await.as_deref(), Some("tok-123"));
    }

    #[tokio::test]
    async fn test_failed_login_leaves_store_untouched() {
        let (auth, tokens) = manager(FakeAuthApi::new("a@b.com", "pw"));

        let err = auth.login("a@b.com", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), "invalid credentials");
        assert!(auth.current().is_none());
        assert!(tokens.current().await.is_none());
    }

    #[tokio::test]
    async fn test_identity_fetch_failure_fails_login() {
        let api = FakeAuthApi::new("a@b.com", "pw");
        *api.reject_me.lock().unwrap() = true;
        let (auth, _tokens) = manager(api);

        assert!(auth.login("a@b.com", "pw").await.is_err());
        assert!(auth.current().is_none());
    }

    #[tokio::test]
    async fn test_register_then_auto_login_matches_direct_login() {
        let (auth, tokens) = manager(FakeAuthApi::unregistered("a@b.com", "pw"));

        let user = auth.register("a@b.com", "pw").await.unwrap();
        assert_eq!(user.email, "a@b.com");
        assert!(auth.is_authenticated());
        assert_eq!(tokens.current().await.as_deref(), Some("tok-123"));
    }

    #[tokio::test]
    async fn test_logout_clears_identity_and_credential() {
        let (auth, tokens) = manager(FakeAuthApi::new("a@b.com", "pw"));
        auth.login("a@b.com", "pw").await.unwrap();

        auth.logout().await.unwrap();
        assert!(auth.current().is_none());
        assert!(tokens.current().await.is_none());
    }

    #[tokio::test]
    async fn test_restore_with_valid_token() {
        let (auth, tokens) = manager(FakeAuthApi::new("a@b.com", "pw"));
        tokens.set(Some("tok-123".to_string())).await.unwrap();

        let user = auth.restore().await.unwrap();
        assert_eq!(user.unwrap().email, "a@b.com");
        assert!(auth.is_authenticated());
    }

    #[tokio::test]
    async fn test_restore_discards_rejected_token() {
        let api = FakeAuthApi::new("a@b.com", "pw");
        *api.reject_me.lock().unwrap() = true;
        let (auth, tokens) = manager(api);
        tokens.set(Some("stale".to_string())).await.unwrap();

        assert!(auth.restore().await.unwrap().is_none());
        assert!(auth.current().is_none());
        assert!(tokens.current().await.is_none());
    }

    #[tokio::test]
    async fn test_restore_without_token_is_noop() {
        let (auth, _tokens) = manager(FakeAuthApi::new("a@b.com", "pw"));
        assert!(auth.restore().await.unwrap().is_none());
        assert!(!auth.is_authenticated());
    }
}
