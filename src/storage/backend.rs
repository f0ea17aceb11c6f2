use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// A synchronous string-to-string store, the shape of a browser's
/// `localStorage`.
pub trait KeyValueBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

fn check_quota(quota: Option<usize>, used_elsewhere: usize, key: &str, value: &str) -> Result<(), StorageError> {
    if let Some(quota) = quota {
        let needed = used_elsewhere + key.len() + value.len();
        if needed > quota {
            return Err(StorageError::QuotaExceeded { needed, quota });
        }
    }
    Ok(())
}

/// Keeps each key in its own `<key>.json` file under one directory.
pub struct FileBackend {
    dir: PathBuf,
    quota: Option<usize>,
}

impl FileBackend {
    /// Creates the directory if needed. Failure to create it is not reported
    /// here; the availability probe in `StorageCore` will catch it.
    pub fn new(dir: impl Into<PathBuf>, quota: Option<usize>) -> Self {
        let dir = dir.into();
        if !dir.exists() {
            let _ = fs::create_dir_all(&dir);
        }
        FileBackend { dir, quota }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file}.json"))
    }

    fn used_bytes_except(&self, key: &str) -> Result<usize, StorageError> {
        let mut total = 0;
        for other in self.keys()? {
            if other == key {
                continue;
            }
            let len = fs::metadata(self.path_for(&other))?.len() as usize;
            total += other.len() + len;
        }
        Ok(total)
    }
}

impl KeyValueBackend for FileBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let mut f = OpenOptions::new().read(true).open(&path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        Ok(Some(s))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.quota.is_some() {
            check_quota(self.quota, self.used_bytes_except(key)?, key, value)?;
        }
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.path_for(key))?;
        f.write_all(value.as_bytes())?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Process-lifetime store. Stands in for `sessionStorage`, and for
/// `localStorage` in tests.
#[derive(Default)]
pub struct MemoryBackend {
    items: RefCell<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        MemoryBackend {
            items: RefCell::default(),
            quota: Some(quota),
        }
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let used: usize = self
            .items
            .borrow()
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        check_quota(self.quota, used, key, value)?;
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.items.borrow().keys().cloned().collect())
    }
}

/// A backend that refuses everything, like storage in some private
/// browsing modes.
pub struct DisabledBackend;

impl KeyValueBackend for DisabledBackend {
    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable)
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }

    fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Err(StorageError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_backend_round_trips_and_lists_keys() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path().join("data"), None);
        assert_eq!(backend.get_item("users").unwrap(), None);
        backend.set_item("users", "[]").unwrap();
        backend.set_item("projects", "[1]").unwrap();
        assert_eq!(backend.get_item("users").unwrap().as_deref(), Some("[]"));
        assert_eq!(backend.keys().unwrap(), vec!["projects", "users"]);
        backend.remove_item("users").unwrap();
        assert_eq!(backend.get_item("users").unwrap(), None);
    }

    #[test]
    fn memory_quota_counts_other_keys_only() {
        let backend = MemoryBackend::with_quota(20);
        backend.set_item("a", "0123456789").unwrap();
        // overwriting the same key does not double count
        backend.set_item("a", "0123456789").unwrap();
        let err = backend.set_item("b", "0123456789").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
    }

    #[test]
    fn file_quota_is_enforced() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path(), Some(16));
        backend.set_item("k", "12345").unwrap();
        assert!(backend.set_item("other", "1234567890").is_err());
    }
}
