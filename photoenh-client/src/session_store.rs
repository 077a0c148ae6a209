//! Pending-photo cache
//!
//! Persists the `LocalSession` produced by an anonymous upload so it survives a
//! restart or a trip through signup. The cache is best-effort: writes never
//! fail the caller, and a corrupt cache heals itself on the next load.
//!
//! Two keys are used and they always move together:
//! - `pendingEnhancedImages`: JSON array of photo records
//! - `pendingRequiresLogin`: JSON boolean

use photoenh_common::{EnhancedPhoto, Error, LocalSession, Result};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub const PENDING_PHOTOS_KEY: &str = "pendingEnhancedImages";
pub const REQUIRES_LOGIN_KEY: &str = "pendingRequiresLogin";

/// String key-value storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Key-value store kept as one JSON object on disk
///
/// Writes go to a sibling temp file which is then renamed over the original.
pub struct FileKeyValueStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&contents) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Unreadable store file, treating as empty");
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(map)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn locked<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| Error::Storage("Store lock poisoned".to_string()))?;
        f()
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.locked(|| Ok(self.read_map()?.get(key).cloned()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.locked(|| {
            let mut map = self.read_map()?;
            map.insert(key.to_string(), value.to_string());
            self.write_map(&map)
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.locked(|| {
            let mut map = self.read_map()?;
            if map.remove(key).is_some() {
                self.write_map(&map)?;
            }
            Ok(())
        })
    }
}

/// In-memory key-value store with an optional byte quota
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes that would push keys plus values past `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota: Some(bytes),
        }
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Storage("Store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries()?;
        if let Some(quota) = self.quota {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(Error::Storage(format!("Quota of {} bytes exceeded", quota)));
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// Typed access to the pending-photo cache
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Replace the cached session
    ///
    /// Never fails. If either key cannot be written both are removed so a
    /// half-written session is never left behind.
    pub fn save(&self, session: &LocalSession) {
        let photos = match serde_json::to_string(&session.pending_photos) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Could not serialize pending photos, not caching");
                return;
            }
        };

        let written = self
            .kv
            .set(PENDING_PHOTOS_KEY, &photos)
            .and_then(|_| self.kv.set(REQUIRES_LOGIN_KEY, &session.requires_login.to_string()));

        match written {
            Ok(()) => debug!(
                count = session.pending_photos.len(),
                requires_login = session.requires_login,
                "Cached pending photos"
            ),
            Err(e) => {
                warn!(error = %e, "Could not cache pending photos");
                self.clear();
            }
        }
    }

    /// Load the cached session
    ///
    /// Records missing either image URL are dropped. When nothing valid is
    /// left (or the cache is unreadable) the store is cleared and `None`
    /// returned.
    pub fn load(&self) -> Option<LocalSession> {
        let raw = match self.kv.get(PENDING_PHOTOS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Pending photo cache unavailable");
                return None;
            }
        };

        let records: Vec<Value> = match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Corrupt pending photo cache, clearing");
                self.clear();
                return None;
            }
        };

        let total = records.len();
        let pending_photos: Vec<EnhancedPhoto> = records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<EnhancedPhoto>(record) {
                Ok(photo) => Some(photo),
                Err(e) => {
                    debug!(error = %e, "Dropping invalid cached photo");
                    None
                }
            })
            .collect();

        if pending_photos.is_empty() {
            warn!(total, "No valid photos in pending cache, clearing");
            self.clear();
            return None;
        }

        if pending_photos.len() < total {
            info!(kept = pending_photos.len(), total, "Dropped invalid cached photos");
        }

        let requires_login = match self.kv.get(REQUIRES_LOGIN_KEY) {
            Ok(Some(flag)) => serde_json::from_str::<bool>(&flag).unwrap_or(false),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Could not read login flag, assuming false");
                false
            }
        };

        Some(LocalSession::new(pending_photos, requires_login))
    }

    /// Remove both keys
    pub fn clear(&self) {
        for key in [PENDING_PHOTOS_KEY, REQUIRES_LOGIN_KEY] {
            if let Err(e) = self.kv.remove(key) {
                warn!(key, error = %e, "Could not remove cache entry");
            }
        }
    }
}
