//! File-backed credential storage.
//!
//! Persists the bearer token as a single file under the user config
//! directory so a session survives process restarts.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use forge_client_core::{TokenStore, TokenStoreError};

const APP_DIR: &str = "agentforge";
const TOKEN_FILE: &str = "access_token";

/// Token store persisted at `<config dir>/agentforge/access_token`.
///
/// The constructor loads any persisted credential, so it is available
/// before the first authenticated call is made.
pub struct FileTokenStore {
    path: PathBuf,
    cached: RwLock<Option<String>>,
}

impl FileTokenStore {
    /// Open the store at the default location.
    ///
    /// # Errors
    /// Returns an error if no config directory exists or the persisted
    /// file cannot be read.
    pub fn new() -> Result<Self, TokenStoreError> {
        let dir = dirs::config_dir().ok_or(TokenStoreError::NoConfigDir)?;
        Self::at_path(dir.join(APP_DIR).join(TOKEN_FILE))
    }

    /// Open the store at an explicit path.
    ///
    /// # Errors
    /// Returns an error if an existing file cannot be read.
    pub fn at_path(path: PathBuf) -> Result<Self, TokenStoreError> {
        let cached = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    None
                } else {
                    Some(token.to_string())
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            cached: RwLock::new(cached),
        })
    }

    /// Location of the persisted credential.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn current(&self) -> Option<String> {
        self.cached.read().unwrap().clone()
    }

    async fn set(&self, token: Option<String>) -> Result<(), TokenStoreError> {
        match &token {
            Some(value) => {
                if let Some(parent) = self.path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&self.path, value).await?;
            }
            None => match tokio::fs::remove_file(&self.path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        *self.cached.write().unwrap() = token;
        Ok(())
    }
}
