//! Core abstractions for the AgentForge workflow client.
//!
//! This crate provides the fundamental building blocks:
//! - Wire types (`AgentUpdate`, `ExecutionRequest`, `User`, ...)
//! - `AgentApi` and `TokenStore` traits with their error types
//! - `StateCell` - observable execution state with subscribe/notify

pub mod state;
pub mod traits;
pub mod types;

pub use state::{ExecutionPhase, ExecutionState, StateCell};
pub use traits::{AgentApi, ApiError, SessionId, StreamError, TokenStore, TokenStoreError, UpdateStream};
pub use types::{
    AgentUpdate, ExecuteResponse, ExecutionRequest, RunStatus, SessionSummary, StampedUpdate,
    Token, UpdateKind, User, WorkflowKind,
};
