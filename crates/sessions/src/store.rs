use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError, RwLock},
};

use {anyhow::Result, tracing::debug};

use crate::key::SessionKey;

/// String key/value storage scoped to one login session.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Typed accessors for the keys the client uses.
pub trait SessionStorageExt: SessionStorage {
    /// The stored bearer token, if any. Empty strings count as absent.
    fn auth_token(&self) -> Option<String> {
        self.get(SessionKey::AuthToken.as_str())
            .filter(|t| !t.is_empty())
    }

    fn set_auth_token(&self, token: &str) -> Result<()> {
        self.set(SessionKey::AuthToken.as_str(), token)
    }

    fn clear_auth_token(&self) -> Result<()> {
        self.remove(SessionKey::AuthToken.as_str())
    }

    /// True only when the bypass flag holds exactly `"true"`.
    fn bypass_auth(&self) -> bool {
        self.get(SessionKey::BypassAuth.as_str()).as_deref() == Some("true")
    }

    fn set_bypass_auth(&self, enabled: bool) -> Result<()> {
        if enabled {
            self.set(SessionKey::BypassAuth.as_str(), "true")
        } else {
            self.remove(SessionKey::BypassAuth.as_str())
        }
    }
}

impl<T: SessionStorage + ?Sized> SessionStorageExt for T {}

// ── In-memory ────────────────────────────────────────────────────────────────

/// Process-local storage; gone when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

// ── File-backed ──────────────────────────────────────────────────────────────

/// JSON-file storage, e.g. `~/.parlor/session.json`.
///
/// Every call re-reads the file so separate CLI invocations share one session.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> HashMap<String, String> {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|d| serde_json::from_str(&d).ok())
            .unwrap_or_default()
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, data)?;

        // The token is a credential: owner-only on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.read_map().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map();
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)?;
        debug!(key, path = %self.path.display(), "session entry stored");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.path.exists() {
            return Ok(());
        }
        let mut map = self.read_map();
        if map.remove(key).is_some() {
            self.write_map(&map)?;
            debug!(key, path = %self.path.display(), "session entry removed");
        }
        Ok(())
    }
}
