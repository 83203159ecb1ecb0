//! Client configuration.

/// Environment variable overriding the backend base URL.
pub const ENV_BASE_URL: &str = "AGENTFORGE_API_URL";

/// Local development backend.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing slash.
    pub base_url: String,
}

impl ClientConfig {
    #[must_use]
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Read the base URL from the environment, falling back to the
    /// local development address.
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var(ENV_BASE_URL) {
            Ok(url) if !url.trim().is_empty() => Self::new(url),
            _ => Self::default(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
