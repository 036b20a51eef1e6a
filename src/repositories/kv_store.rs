use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::StorageError;

pub const HISTORY_KEY: &str = "STUDYMATE_HISTORY_DB";
pub const SESSION_KEY: &str = "STUDYMATE_SESSION";
pub const GUEST_USAGE_KEY: &str = "STUDYMATE_GUEST_USAGE";

static KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("KEY_PATTERN is a valid regex pattern"));

const TMP_SUFFIX: &str = ".tmp";

/// Synchronous, capacity-bounded key-value storage.
///
/// `set` either replaces the whole value or leaves the previous one in
/// place; a write that would exceed capacity fails with
/// `StorageError::CapacityExceeded`.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    fn capacity_bytes(&self) -> usize;
    fn used_bytes(&self) -> Result<usize, StorageError>;
}

fn entry_size(key: &str, value_len: usize) -> usize {
    key.len() + value_len
}

fn check_key(key: &str) -> Result<(), StorageError> {
    if KEY_PATTERN.is_match(key) && !key.ends_with(TMP_SUFFIX) && !key.chars().all(|c| c == '.') {
        Ok(())
    } else {
        Err(StorageError::Other(format!("Invalid storage key '{}'", key)))
    }
}

/// In-process store with a byte budget, the way browser local storage
/// counts keys and values together.
#[derive(Debug)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    capacity: AtomicUsize,
}

impl MemoryKvStore {
    pub fn with_capacity(capacity_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: AtomicUsize::new(capacity_bytes),
        }
    }

    pub fn unbounded() -> Self {
        Self::with_capacity(usize::MAX)
    }

    /// Changes the budget; existing entries are kept even when over it.
    pub fn set_capacity_bytes(&self, capacity_bytes: usize) {
        self.capacity.store(capacity_bytes, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Other("Storage lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut entries = self.lock()?;
        let used: usize = entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| entry_size(k, v.len()))
            .sum();
        let required = used + entry_size(key, value.len());
        let capacity = self.capacity_bytes();
        if required > capacity {
            return Err(StorageError::CapacityExceeded { required, capacity });
        }
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn capacity_bytes(&self) -> usize {
        self.capacity.load(Ordering::SeqCst)
    }

    fn used_bytes(&self) -> Result<usize, StorageError> {
        Ok(self
            .lock()?
            .iter()
            .map(|(k, v)| entry_size(k, v.len()))
            .sum())
    }
}

/// One file per key under `root`, with the byte budget applied to the
/// directory total.
#[derive(Debug)]
pub struct FileKvStore {
    root: PathBuf,
    capacity: usize,
    write_lock: Mutex<()>,
}

impl FileKvStore {
    pub fn open(root: impl Into<PathBuf>, capacity_bytes: usize) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            StorageError::Other(format!("Cannot create storage dir {}: {}", root.display(), e))
        })?;
        log::debug!("Opened storage at {}", root.display());
        Ok(Self {
            root,
            capacity: capacity_bytes,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn size_excluding(&self, skip: Option<&str>) -> Result<usize, StorageError> {
        let mut total = 0;
        let entries = fs::read_dir(&self.root).map_err(io_error)?;
        for entry in entries {
            let entry = entry.map_err(io_error)?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(TMP_SUFFIX) || Some(name.as_str()) == skip {
                continue;
            }
            let len = entry.metadata().map_err(io_error)?.len() as usize;
            total += entry_size(&name, len);
        }
        Ok(total)
    }
}

fn io_error(err: std::io::Error) -> StorageError {
    StorageError::Other(err.to_string())
}

impl KeyValueStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        check_key(key)?;
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(e)),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        check_key(key)?;
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StorageError::Other("Storage lock poisoned".to_string()))?;

        let required = self.size_excluding(Some(key))? + entry_size(key, value.len());
        if required > self.capacity {
            return Err(StorageError::CapacityExceeded {
                required,
                capacity: self.capacity,
            });
        }

        let tmp = self.root.join(format!("{}{}", key, TMP_SUFFIX));
        fs::write(&tmp, value).map_err(io_error)?;
        if let Err(e) = fs::rename(&tmp, self.path_for(key)) {
            let _ = fs::remove_file(&tmp);
            return Err(io_error(e));
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        check_key(key)?;
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e)),
        }
    }

    fn capacity_bytes(&self) -> usize {
        self.capacity
    }

    fn used_bytes(&self) -> Result<usize, StorageError> {
        self.size_excluding(None)
    }
}
