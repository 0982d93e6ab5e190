//! Bearer token persistence
//!
//! Exactly one token is kept at a time. The store does no validation; it is
//! purely a key-value boundary that the session and the request client share.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("Failed to access token file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data directory not found")]
    NoDataDir,
}

/// Persistent storage for a single bearer token
pub trait TokenStore: Send + Sync {
    /// Current token, if any. Never fails: unreadable storage reads as absent.
    fn get(&self) -> Option<String>;

    /// Store a token, replacing any previous value
    fn set(&self, token: &str) -> Result<(), TokenStoreError>;

    /// Remove the token. Clearing an empty store succeeds.
    fn clear(&self) -> Result<(), TokenStoreError>;
}

/// Token kept in a single file that survives restarts
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the platform data directory:
    /// - Linux: ~/.local/share/flitify/token
    /// - macOS: ~/Library/Application Support/flitify/token
    /// - Windows: %APPDATA%\flitify\token
    pub fn default_location() -> Result<Self, TokenStoreError> {
        dirs::data_dir()
            .map(|p| Self::new(p.join("flitify").join(crate::TOKEN_KEY)))
            .ok_or(TokenStoreError::NoDataDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("Failed to read token from {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn set(&self, token: &str) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&self.path, token)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process token store, lost on exit
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set(&self, token: &str) -> Result<(), TokenStoreError> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        self.token.lock().unwrap_or_else(|e| e.into_inner()).take();
        Ok(())
    }
}
