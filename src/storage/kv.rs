use std::rc::Rc;

use tracing::{debug, warn};

use super::backend::KeyValueBackend;
use super::keys;
use crate::error::StorageError;

const PROBE_KEY: &str = "__storage_test__";

/// Wraps a key-value backend with availability detection, one-shot quota
/// recovery and error swallowing.
///
/// `get`/`set`/`remove` never fail: errors are logged and turned into `None`
/// or `false`. The `try_*` variants return the underlying error instead.
#[derive(Clone)]
pub struct StorageCore {
    backend: Rc<dyn KeyValueBackend>,
    available: bool,
}

impl StorageCore {
    pub fn new(backend: impl KeyValueBackend + 'static) -> Self {
        Self::from_rc(Rc::new(backend))
    }

    pub fn from_rc(backend: Rc<dyn KeyValueBackend>) -> Self {
        let available = probe(backend.as_ref());
        if !available {
            warn!("storage is not available, reads will return defaults and writes are dropped");
        }
        StorageCore { backend, available }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn try_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if !self.available {
            return Err(StorageError::Unavailable);
        }
        self.backend.get_item(key)
    }

    pub fn try_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if !self.available {
            return Err(StorageError::Unavailable);
        }
        match self.backend.set_item(key, value) {
            Err(StorageError::QuotaExceeded { needed, quota }) => {
                warn!(key, needed, quota, "storage quota exceeded, evicting cached keys");
                let evicted = self.evict_cache(key);
                if evicted == 0 {
                    return Err(StorageError::QuotaExceeded { needed, quota });
                }
                self.backend.set_item(key, value)
            }
            other => other,
        }
    }

    pub fn try_remove(&self, key: &str) -> Result<(), StorageError> {
        if !self.available {
            return Err(StorageError::Unavailable);
        }
        self.backend.remove_item(key)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(StorageError::Unavailable) => None,
            Err(e) => {
                warn!(key, error = %e, "failed to read from storage");
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: &str) -> bool {
        match self.try_set(key, value) {
            Ok(()) => {
                debug!(key, bytes = value.len(), "stored value");
                true
            }
            Err(e) => {
                warn!(key, error = %e, "failed to write to storage");
                false
            }
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        match self.try_remove(key) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "failed to remove from storage");
                false
            }
        }
    }

    pub fn keys(&self) -> Vec<String> {
        if !self.available {
            return Vec::new();
        }
        self.backend.keys().unwrap_or_else(|e| {
            warn!(error = %e, "failed to list storage keys");
            Vec::new()
        })
    }

    /// Removes every key. Returns how many were removed.
    pub fn clear(&self) -> usize {
        self.keys().iter().filter(|k| self.remove(k)).count()
    }

    /// Drops the backup and diagnostic keys, never the one being written.
    fn evict_cache(&self, writing: &str) -> usize {
        keys::EVICTABLE
            .iter()
            .filter(|k| **k != writing)
            .filter(|k| matches!(self.backend.get_item(k), Ok(Some(_))))
            .filter(|k| self.backend.remove_item(k).is_ok())
            .count()
    }
}

fn probe(backend: &dyn KeyValueBackend) -> bool {
    backend.set_item(PROBE_KEY, PROBE_KEY).is_ok() && backend.remove_item(PROBE_KEY).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::{DisabledBackend, MemoryBackend};

    #[test]
    fn disabled_backend_is_detected() {
        let core = StorageCore::new(DisabledBackend);
        assert!(!core.is_available());
        assert_eq!(core.get("users"), None);
        assert!(!core.set("users", "[]"));
        assert!(matches!(core.try_get("users"), Err(StorageError::Unavailable)));
    }

    #[test]
    fn quota_recovery_evicts_backups_once() {
        let core = StorageCore::new(MemoryBackend::with_quota(64));
        assert!(core.set(keys::CLOUD_USERS_BACKUP, &"x".repeat(30)));
        // would need 18 + 30 + 5 + 20 bytes, only fits once the backup is gone
        assert!(core.set(keys::USERS, &"y".repeat(20)));
        assert_eq!(core.get(keys::CLOUD_USERS_BACKUP), None);
        assert!(core.get(keys::USERS).is_some());
    }

    #[test]
    fn quota_failure_without_evictable_keys_is_reported() {
        let core = StorageCore::new(MemoryBackend::with_quota(32));
        assert!(core.set(keys::USERS, &"y".repeat(20)));
        let err = core.try_set(keys::PROJECTS, &"z".repeat(20)).unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert!(!core.set(keys::PROJECTS, &"z".repeat(20)));
    }
}
