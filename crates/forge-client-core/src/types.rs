//! Wire types shared between the transport and session layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::traits::SessionId;

/// Workflow kind selected when submitting a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowKind {
    /// Execute the query end to end.
    #[default]
    Execution,
    /// Maintenance workflow (diagnostics, cleanup).
    Maintenance,
}

/// One user-submitted query plus chosen workflow kind.
///
/// Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub query: String,
    pub workflow_type: WorkflowKind,
}

impl ExecutionRequest {
    #[must_use]
    pub fn new<S: Into<String>>(query: S, workflow_type: WorkflowKind) -> Self {
        Self {
            query: query.into(),
            workflow_type,
        }
    }
}

/// Kind discriminator carried by every update event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    Status,
    Result,
    Error,
    /// Heartbeat; never surfaced to observers.
    Keepalive,
}

/// Workflow status reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Analyzing,
    Executing,
    Completed,
    Failed,
}

impl RunStatus {
    /// Whether no further updates follow this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One progress/result/error message from an execution stream.
///
/// Keepalive events carry only the `type` field, so everything else
/// is optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentUpdate {
    #[serde(rename = "type")]
    pub kind: UpdateKind,
    pub status: Option<RunStatus>,
    pub message: Option<String>,
    pub current_agent: Option<String>,
    pub progress: Option<u8>,
    pub result: Option<String>,
    pub final_result: Option<String>,
    pub error: Option<String>,
    pub error_message: Option<String>,
}

impl AgentUpdate {
    #[must_use]
    pub fn is_keepalive(&self) -> bool {
        self.kind == UpdateKind::Keepalive
    }

    /// Terminal status carried by this update, if any.
    #[must_use]
    pub fn terminal_status(&self) -> Option<RunStatus> {
        self.status.filter(|s| s.is_terminal())
    }

    /// Best available error text (`error` takes precedence).
    #[must_use]
    pub fn error_text(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.error_message.as_deref())
    }
}

/// An accepted update stamped with its client-side receipt time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampedUpdate {
    pub update: AgentUpdate,
    pub received_at: DateTime<Utc>,
}

impl StampedUpdate {
    /// Stamp an update with the current time.
    #[must_use]
    pub fn now(update: AgentUpdate) -> Self {
        Self {
            update,
            received_at: Utc::now(),
        }
    }
}

/// Response to a successful execute request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    /// Handle correlating the request with its update stream.
    pub session_id: Option<SessionId>,
    pub status: String,
    pub message: String,
}

/// Bearer token returned by login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

/// Authenticated user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persisted session record returned by the session-list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub user_id: i64,
    pub query: String,
    pub workflow_type: String,
    pub status: String,
    pub current_agent: Option<String>,
    pub progress: i32,
    #[serde(default)]
    pub intermediate_results: Vec<Value>,
    pub final_result: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_deserialization() {
        let json = r#"{
            "type": "status",
            "status": "executing",
            "progress": 60,
            "current_agent": "writer",
            "message": "Status: executing"
        }"#;
        let update: AgentUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.kind, UpdateKind::Status);
        assert_eq!(update.status, Some(RunStatus::Executing));
        assert_eq!(update.progress, Some(60));
        assert_eq!(update.current_agent.as_deref(), Some("writer"));
        assert!(update.terminal_status().is_none());
    }

    #[test]
    fn test_keepalive_has_only_kind() {
        let update: AgentUpdate = serde_json::from_str(r#"{"type": "keepalive"}"#).unwrap();
        assert!(update.is_keepalive());
        assert!(update.status.is_none());
        assert!(update.message.is_none());
    }

    #[test]
    fn test_terminal_status() {
        let update: AgentUpdate = serde_json::from_str(
            r#"{"type": "status", "status": "failed", "error_message": "boom"}"#,
        )
        .unwrap();
        assert_eq!(update.terminal_status(), Some(RunStatus::Failed));
        assert_eq!(update.error_text(), Some("boom"));
    }

    #[test]
    fn test_request_serialization() {
        let request = ExecutionRequest::new("Draft an apology email", WorkflowKind::Execution);
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""workflow_type":"execution""#));
    }

    #[test]
    fn test_execute_response_without_session_id() {
        let response: ExecuteResponse =
            serde_json::from_str(r#"{"status": "queued", "message": "started"}"#).unwrap();
        assert!(response.session_id.is_none());
    }
}
