use std::sync::Arc;

use crate::{
    errors::{AppError, AppResult, StorageError},
    models::domain::HistoryItem,
    repositories::kv_store::{KeyValueStore, HISTORY_KEY},
};

/// Persists the newest-first history list as one serialized unit.
pub trait HistoryRepository: Send + Sync {
    fn load_all(&self) -> AppResult<Vec<HistoryItem>>;
    /// Replaces the stored list. Storage errors come back untouched so the
    /// caller can tell capacity failures apart.
    fn persist(&self, items: &[HistoryItem]) -> Result<(), StorageError>;
}

pub struct KvHistoryRepository {
    store: Arc<dyn KeyValueStore>,
}

impl KvHistoryRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

impl HistoryRepository for KvHistoryRepository {
    fn load_all(&self) -> AppResult<Vec<HistoryItem>> {
        let Some(bytes) = self.store.get(HISTORY_KEY)? else {
            return Ok(Vec::new());
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            log::error!("Stored history is unreadable: {}", e);
            AppError::StorageError(format!("Stored history is unreadable: {}", e))
        })
    }

    fn persist(&self, items: &[HistoryItem]) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(items)
            .map_err(|e| StorageError::Other(format!("Cannot serialize history: {}", e)))?;
        self.store.set(HISTORY_KEY, &bytes)
    }
}
