use std::sync::Arc;

use crate::{
    errors::{AppError, AppResult},
    models::domain::HistoryItem,
    repositories::HistoryRepository,
};

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub items: Vec<HistoryItem>,
    pub evicted: usize,
}

pub struct HistoryService {
    repository: Arc<dyn HistoryRepository>,
}

impl HistoryService {
    pub fn new(repository: Arc<dyn HistoryRepository>) -> Self {
        Self { repository }
    }

    /// Prepends `item` and persists, evicting the oldest entries one at a
    /// time while storage reports a capacity failure.
    ///
    /// Runs at most `existing.len() + 1` writes. If even the item alone does
    /// not fit, the stored list is left as it was and `ItemTooLarge` is
    /// returned. Any non-capacity failure stops immediately.
    pub fn save(&self, item: HistoryItem) -> AppResult<SaveOutcome> {
        let mut kept = self.repository.load_all()?;
        let existing = kept.len();
        let item_id = item.id.clone();

        for _ in 0..=existing {
            let candidate: Vec<HistoryItem> = std::iter::once(item.clone())
                .chain(kept.iter().cloned())
                .collect();

            match self.repository.persist(&candidate) {
                Ok(()) => {
                    let evicted = existing - kept.len();
                    if evicted > 0 {
                        log::info!(
                            "Saved history item {} after evicting {} oldest item(s)",
                            item_id,
                            evicted
                        );
                    } else {
                        log::info!("Saved history item {}", item_id);
                    }
                    return Ok(SaveOutcome {
                        items: candidate,
                        evicted,
                    });
                }
                Err(err) if err.is_capacity() => {
                    if kept.pop().is_none() {
                        log::warn!("History item {} does not fit in storage: {}", item_id, err);
                        return Err(AppError::ItemTooLarge(format!(
                            "'{}' is too large to save in local history",
                            item.file_name
                        )));
                    }
                    log::debug!("Storage full, evicting oldest history item");
                }
                Err(err) => {
                    log::error!("Unexpected storage error while saving history: {}", err);
                    return Err(err.into());
                }
            }
        }

        // kept is empty after existing + 1 capacity failures, handled above
        Err(AppError::InternalError(
            "History eviction loop exhausted".to_string(),
        ))
    }

    /// Removes the item with `id`; unknown ids are ignored.
    pub fn delete(&self, id: &str) -> AppResult<Vec<HistoryItem>> {
        let mut items = self.repository.load_all()?;
        let before = items.len();
        items.retain(|item| item.id != id);

        if items.len() == before {
            log::debug!("No history item with id {} to delete", id);
            return Ok(items);
        }

        self.repository.persist(&items).map_err(|err| {
            log::error!("Failed to delete history item {}: {}", id, err);
            AppError::from(err)
        })?;
        log::info!("Deleted history item {}", id);
        Ok(items)
    }

    /// Deletes `id` only when it belongs to `owner_id`; anything else is
    /// `NotFound` and storage is not touched. Returns the owner's remaining
    /// items.
    pub fn delete_owned(&self, owner_id: &str, id: &str) -> AppResult<Vec<HistoryItem>> {
        self.get(owner_id, id)?;
        let remaining = self.delete(id)?;
        Ok(remaining
            .into_iter()
            .filter(|i| i.owned_by(owner_id))
            .collect())
    }

    /// Items owned by `owner_id`, newest first.
    pub fn list(&self, owner_id: &str) -> AppResult<Vec<HistoryItem>> {
        let items = self.repository.load_all()?;
        Ok(items.into_iter().filter(|i| i.owned_by(owner_id)).collect())
    }

    pub fn get(&self, owner_id: &str, id: &str) -> AppResult<HistoryItem> {
        self.list(owner_id)?
            .into_iter()
            .find(|i| i.id == id)
            .ok_or_else(|| AppError::NotFound(format!("History item with id '{}' not found", id)))
    }
}
