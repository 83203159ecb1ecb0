//! reqwest-based implementation of the `AgentApi` trait.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;

use forge_client_core::{
    AgentApi, ApiError, ExecuteResponse, ExecutionRequest, SessionId, SessionSummary, Token,
    TokenStore, UpdateStream, User,
};

use crate::config::ClientConfig;
use crate::sse;

/// Authenticated JSON client for the agent backend.
///
/// Attaches `Authorization: Bearer <token>` whenever the token store
/// holds a credential. Every failure is returned as an `ApiError`;
/// nothing is raised past this boundary.
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    tokens: Arc<dyn TokenStore>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

impl ApiClient {
    #[must_use]
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            tokens,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    async fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.tokens.current().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let builder = self.http.get(self.url(path));
        self.dispatch(builder).await
    }

    async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let builder = self.http.post(self.url(path)).json(body);
        self.dispatch(builder).await
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let builder = self.authorize(builder).await;
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Extract a human-readable message from an error response body.
///
/// FastAPI backends report errors as `{"detail": "..."}`.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = value.get("detail").and_then(|d| d.as_str()) {
            return detail.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP error {status}")
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl AgentApi for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<Token, ApiError> {
        self.post("/api/auth/login", &Credentials { email, password })
            .await
    }

    async fn register(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .post("/api/auth/register", &Credentials { email, password })
            .await?;
        Ok(())
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        self.get("/api/auth/me").await
    }

    async fn list_sessions(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<SessionSummary>, ApiError> {
        self.get(&format!("/api/agents/sessions?skip={skip}&limit={limit}"))
            .await
    }

    async fn execute_agent(
        &self,
        request: &ExecutionRequest,
    ) -> Result<ExecuteResponse, ApiError> {
        self.post("/api/agents/execute", request).await
    }

    async fn open_execution_stream(
        &self,
        session_id: SessionId,
    ) -> Result<UpdateStream, ApiError> {
        let url = self.url(&format!("/api/agents/execute/{session_id}/stream"));
        sse::open(self.http.clone(), url, self.tokens.current().await).await
    }
}
