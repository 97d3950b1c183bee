//! Token persistence.
//!
//! DESIGN
//! ======
//! Two opaque bearer strings stored under fixed keys. No expiry metadata
//! is kept: validity is discovered reactively when the server answers 401.
//! The in-memory store is for tests and embedders; the file store persists
//! across process restarts for one local profile (the CLI uses it).

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::net::tokens::TokenPair;

/// Fixed storage keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKey {
    AccessToken,
    RefreshToken,
}

impl TokenKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "accessToken",
            Self::RefreshToken => "refreshToken",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("token file io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("token file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable key-value persistence for the token pair.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: TokenKey) -> Option<String>;

    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, key: TokenKey, value: &str) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn remove(&self, key: TokenKey) -> Result<(), StorageError>;

    fn access_token(&self) -> Option<String> {
        self.get(TokenKey::AccessToken)
    }

    fn refresh_token(&self) -> Option<String> {
        self.get(TokenKey::RefreshToken)
    }

    /// Persist both halves of a pair. A missing refresh token leaves the
    /// stored one untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn store_pair(&self, pair: &TokenPair) -> Result<(), StorageError> {
        self.set(TokenKey::AccessToken, &pair.access_token)?;
        if let Some(refresh) = &pair.refresh_token {
            self.set(TokenKey::RefreshToken, refresh)?;
        }
        Ok(())
    }

    /// Remove both tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn clear(&self) -> Result<(), StorageError> {
        self.remove(TokenKey::AccessToken)?;
        self.remove(TokenKey::RefreshToken)
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<BTreeMap<TokenKey, String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given tokens already present.
    #[must_use]
    pub fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        let mut entries = BTreeMap::new();
        if let Some(access) = access {
            entries.insert(TokenKey::AccessToken, access.to_owned());
        }
        if let Some(refresh) = refresh {
            entries.insert(TokenKey::RefreshToken, refresh.to_owned());
        }
        Self { entries: Mutex::new(entries) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: TokenKey) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value.to_owned());
        Ok(())
    }

    fn remove(&self, key: TokenKey) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        Ok(())
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// JSON file keyed by the same names a browser profile would use:
/// `{"accessToken": "...", "refreshToken": "..."}`.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileTokenStore {
    /// Open (or lazily create) the token file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries: Mutex::new(entries) })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        if let Err(e) = std::fs::remove_file(&tmp) {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(e.into());
            }
        }
        let mut file = owner_only().write(true).create_new(true).open(&tmp)?;
        file.write_all(&serde_json::to_vec_pretty(entries)?)?;
        file.sync_all()?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Bearer tokens are credentials: the file is readable by its owner only.
#[cfg(unix)]
fn owner_only() -> OpenOptions {
    use std::os::unix::fs::OpenOptionsExt;

    let mut options = OpenOptions::new();
    options.mode(0o600);
    options
}

#[cfg(not(unix))]
fn owner_only() -> OpenOptions {
    OpenOptions::new()
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: TokenKey) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key.as_str())
            .cloned()
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.as_str().to_owned(), value.to_owned());
        self.flush(&entries)
    }

    fn remove(&self, key: TokenKey) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key.as_str()).is_none() {
            return Ok(());
        }
        self.flush(&entries)
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
