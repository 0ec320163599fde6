//! Persistent key/value media behind the durable tier.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::paths::{atomic_write, entry_path, key_from_path};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded: {needed} bytes needed, quota is {quota}")]
    QuotaExceeded { needed: u64, quota: u64 },
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Synchronous string-to-string storage with a finite quota and no
/// cross-key transactions.
pub trait KvStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

impl<S: KvStorage + ?Sized> KvStorage for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        (**self).keys()
    }
}

fn check_quota(quota: Option<u64>, needed: u64) -> Result<(), StorageError> {
    match quota {
        Some(quota) if needed > quota => Err(StorageError::QuotaExceeded { needed, quota }),
        _ => Ok(()),
    }
}

/// In-process storage. Usage is counted as key plus value bytes.
#[derive(Debug, Default)]
pub struct MemoryKvStorage {
    map: RwLock<BTreeMap<String, String>>,
    quota: Option<u64>,
}

impl MemoryKvStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            map: RwLock::new(BTreeMap::new()),
            quota: Some(quota_bytes),
        }
    }

    pub fn used_bytes(&self) -> u64 {
        self.map
            .read()
            .iter()
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum()
    }
}

impl KvStorage for MemoryKvStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.map.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.map.write();
        let others: u64 = map
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum();
        check_quota(self.quota, others + (key.len() + value.len()) as u64)?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.map.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.map.read().keys().cloned().collect())
    }
}

/// One file per key under a root directory. Usage is the total size of
/// entry files.
#[derive(Debug)]
pub struct FsKvStorage {
    root: Arc<Path>,
    quota: Option<u64>,
}

impl FsKvStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root: Arc::from(root),
            quota: None,
        })
    }

    pub fn with_quota<P: AsRef<Path>>(root: P, quota_bytes: u64) -> Result<Self, StorageError> {
        let mut storage = Self::new(root)?;
        storage.quota = Some(quota_bytes);
        Ok(storage)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_files(&self) -> Result<Vec<(PathBuf, String)>, StorageError> {
        let mut files = Vec::new();
        for dirent in std::fs::read_dir(&self.root)? {
            let path = dirent?.path();
            if let Some(key) = key_from_path(&path) {
                files.push((path, key));
            }
        }
        Ok(files)
    }

    pub fn used_bytes(&self) -> Result<u64, StorageError> {
        let mut total = 0;
        for (path, _) in self.entry_files()? {
            total += std::fs::metadata(&path)?.len();
        }
        Ok(total)
    }
}

impl KvStorage for FsKvStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(entry_path(&self.root, key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = entry_path(&self.root, key);
        if self.quota.is_some() {
            let existing = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            let others = self.used_bytes()?.saturating_sub(existing);
            check_quota(self.quota, others + value.len() as u64)?;
        }
        atomic_write(&path, value.as_bytes())?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(entry_path(&self.root, key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entry_files()?.into_iter().map(|(_, key)| key).collect())
    }
}
