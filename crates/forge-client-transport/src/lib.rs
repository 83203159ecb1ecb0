//! HTTP and SSE transport for the AgentForge backend.
//!
//! Provides:
//! - `ClientConfig` - Base URL configuration
//! - `ApiClient` - reqwest-based implementation of `AgentApi`

pub mod config;
pub mod http;
mod sse;

pub use config::ClientConfig;
pub use http::ApiClient;
