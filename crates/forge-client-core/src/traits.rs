//! Traits at the transport and credential-storage seams.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::types::{
    AgentUpdate, ExecuteResponse, ExecutionRequest, SessionSummary, Token, User,
};

/// Backend-assigned execution session identifier.
pub type SessionId = i64;

/// Live stream of update events for one session.
///
/// Dropping the stream cancels the underlying subscription and closes
/// the connection.
pub type UpdateStream = BoxStream<'static, Result<AgentUpdate, StreamError>>;

/// Request/response transport error.
///
/// Every failure is recovered into one of these at the transport
/// boundary; nothing panics past it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Backend answered with a non-2xx status.
    #[error("{message}")]
    Status { status: u16, message: String },
    /// Request never completed (DNS, refused connection, timeout).
    #[error("request failed: {0}")]
    Network(String),
    /// 2xx response with a body that did not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Subscription-level stream error.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("connection to server lost: {0}")]
    Connection(String),
    #[error("malformed update payload: {0}")]
    Payload(String),
}

/// Credential storage error.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("no usable config directory for credential storage")]
    NoConfigDir,
    #[error("credential I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Holder of the persisted bearer credential.
///
/// No network or validation happens here; validity is discovered
/// lazily by the first authenticated call that fails.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Current in-memory credential.
    async fn current(&self) -> Option<String>;

    /// Persist (`Some`) or clear (`None`) the credential.
    ///
    /// In-memory and persisted state are updated atomically from the
    /// caller's perspective.
    async fn set(&self, token: Option<String>) -> Result<(), TokenStoreError>;
}

/// Authenticated operations against the agent backend.
#[async_trait]
pub trait AgentApi: Send + Sync {
    /// Exchange credentials for a bearer token.
    async fn login(&self, email: &str, password: &str) -> Result<Token, ApiError>;

    /// Create an account. Does not establish a session.
    async fn register(&self, email: &str, password: &str) -> Result<(), ApiError>;

    /// Fetch the identity behind the current credential.
    async fn current_user(&self) -> Result<User, ApiError>;

    /// List past execution sessions for the current user.
    async fn list_sessions(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<SessionSummary>, ApiError>;

    /// Submit a query for execution.
    async fn execute_agent(
        &self,
        request: &ExecutionRequest,
    ) -> Result<ExecuteResponse, ApiError>;

    /// Open the live update subscription for an accepted session.
    async fn open_execution_stream(
        &self,
        session_id: SessionId,
    ) -> Result<UpdateStream, ApiError>;
}
