//! Session orchestration and credential storage for the AgentForge client.
//!
//! Provides:
//! - `ExecutionController` - Drive one execution request and its stream
//! - `AuthManager` - Login/register/logout and identity restoration
//! - Credential storage implementations (memory, file)

pub mod auth;
pub mod controller;
pub mod storage;

pub use auth::{AuthError, AuthManager};
pub use controller::{ExecutionController, SubmitError};
pub use storage::{FileTokenStore, MemoryTokenStore};
