use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::kv::StorageCore;
use crate::error::StorageError;

/// Typed JSON values on top of [`StorageCore`].
#[derive(Clone)]
pub struct JsonStorage {
    core: StorageCore,
}

impl JsonStorage {
    pub fn new(core: StorageCore) -> Self {
        JsonStorage { core }
    }

    pub fn core(&self) -> &StorageCore {
        &self.core
    }

    /// Reads `key`, falling back to `default` when the key is absent or its
    /// contents do not parse.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_opt(key).unwrap_or(default)
    }

    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.core.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "stored value is not valid JSON, treating as absent");
                None
            }
        }
    }

    pub fn try_set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let s = serde_json::to_string(value)?;
        self.core.try_set(key, &s)
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(s) => self.core.set(key, &s),
            Err(e) => {
                warn!(key, error = %e, "failed to serialize value");
                false
            }
        }
    }

    /// Read-modify-write of the whole value stored under `key`.
    pub fn update<T, F>(&self, key: &str, default: T, f: F) -> bool
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        let mut value = self.get(key, default);
        f(&mut value);
        self.set(key, &value)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.core.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::MemoryBackend;

    #[test]
    fn corrupt_json_falls_back_to_default() {
        let core = StorageCore::new(MemoryBackend::new());
        core.set("users", "{not json");
        let json = JsonStorage::new(core);
        let users: Vec<String> = json.get("users", vec!["fallback".to_string()]);
        assert_eq!(users, vec!["fallback"]);
    }

    #[test]
    fn update_rewrites_whole_value() {
        let json = JsonStorage::new(StorageCore::new(MemoryBackend::new()));
        assert!(json.update("nums", Vec::<u32>::new(), |v| v.push(1)));
        assert!(json.update("nums", Vec::<u32>::new(), |v| v.push(2)));
        assert_eq!(json.get("nums", Vec::<u32>::new()), vec![1, 2]);
    }
}
