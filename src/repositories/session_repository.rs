use std::sync::Arc;

use crate::{
    errors::StorageError,
    models::domain::{GuestUsage, SessionSnapshot},
    repositories::kv_store::{KeyValueStore, GUEST_USAGE_KEY, SESSION_KEY},
};

/// Persists the workspace snapshot so a restart resumes where the user
/// left off.
pub struct SessionRepository {
    store: Arc<dyn KeyValueStore>,
}

impl SessionRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Best effort. When the store is full the snapshot is saved again
    /// without the uploaded file; a failure after that is logged and
    /// otherwise ignored.
    pub fn save(&self, snapshot: &SessionSnapshot) -> bool {
        match self.write_snapshot(snapshot) {
            Ok(()) => true,
            Err(e) if e.is_capacity() && snapshot.current_file.is_some() => {
                log::warn!("Session snapshot too large, saving without the file: {}", e);
                let slim = SessionSnapshot {
                    current_file: None,
                    ..snapshot.clone()
                };
                match self.write_snapshot(&slim) {
                    Ok(()) => true,
                    Err(e) => {
                        log::warn!("Session snapshot not saved: {}", e);
                        false
                    }
                }
            }
            Err(e) => {
                log::warn!("Session snapshot not saved: {}", e);
                false
            }
        }
    }

    fn write_snapshot(&self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(snapshot).map_err(|e| StorageError::Other(e.to_string()))?;
        self.store.set(SESSION_KEY, &bytes)
    }

    /// Guest counters live under their own key so a snapshot that does
    /// not fit cannot take them down with it.
    pub fn save_usage(&self, usage: &GuestUsage) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(usage).map_err(|e| StorageError::Other(e.to_string()))?;
        self.store.set(GUEST_USAGE_KEY, &bytes)
    }

    pub fn restore_usage(&self) -> Option<GuestUsage> {
        let bytes = match self.store.get(GUEST_USAGE_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Cannot read guest usage: {}", e);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(usage) => Some(usage),
            Err(e) => {
                log::warn!("Discarding unreadable guest usage: {}", e);
                if let Err(e) = self.store.remove(GUEST_USAGE_KEY) {
                    log::warn!("Cannot clear guest usage: {}", e);
                }
                None
            }
        }
    }

    /// Returns `None` when nothing was saved. A snapshot that cannot be
    /// read is removed so the next start is clean.
    pub fn restore(&self) -> Option<SessionSnapshot> {
        let bytes = match self.store.get(SESSION_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Cannot read session snapshot: {}", e);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                log::warn!("Discarding unreadable session snapshot: {}", e);
                self.clear();
                None
            }
        }
    }

    pub fn clear(&self) {
        for key in [SESSION_KEY, GUEST_USAGE_KEY] {
            if let Err(e) = self.store.remove(key) {
                log::warn!("Cannot clear {}: {}", key, e);
            }
        }
    }
}
