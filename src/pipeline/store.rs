//! Artifact store
//!
//! In-memory store of content items. Each item sits behind its own mutex,
//! so writes to one item are serialized while different items can be
//! mutated in parallel. The outer map lock is only held long enough to
//! look an item up.

use crate::error::AppError;
use crate::pipeline::artifacts::Artifact;
use crate::pipeline::item::{ContentItem, ProgressSummary, StageOutcome};
use crate::pipeline::stage::Stage;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

type ItemHandle = Arc<Mutex<ContentItem>>;

/// Thread-safe content item store
pub struct ItemStore {
    items: RwLock<HashMap<Uuid, ItemHandle>>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    fn handle(&self, item_id: Uuid) -> Result<ItemHandle, AppError> {
        self.items
            .read()
            .get(&item_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Content item {} not found", item_id)))
    }

    /// Insert a new item. Ids must be unique.
    pub fn insert(&self, item: ContentItem) -> Result<(), AppError> {
        let mut items = self.items.write();
        if items.contains_key(&item.id) {
            return Err(AppError::Conflict(format!(
                "Content item {} already exists",
                item.id
            )));
        }
        items.insert(item.id, Arc::new(Mutex::new(item)));
        Ok(())
    }

    /// Get a copy of an item
    pub fn get(&self, item_id: Uuid) -> Result<ContentItem, AppError> {
        Ok(self.handle(item_id)?.lock().clone())
    }

    pub fn contains(&self, item_id: Uuid) -> bool {
        self.items.read().contains_key(&item_id)
    }

    /// Copies of the requested items, skipping unknown ids
    pub fn get_many(&self, ids: &[Uuid]) -> Vec<ContentItem> {
        let items = self.items.read();
        ids.iter()
            .filter_map(|id| items.get(id))
            .map(|handle| handle.lock().clone())
            .collect()
    }

    /// Run `f` with exclusive access to one item
    pub fn with_item<T>(
        &self,
        item_id: Uuid,
        f: impl FnOnce(&mut ContentItem) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let handle = self.handle(item_id)?;
        let mut item = handle.lock();
        f(&mut item)
    }

    /// Store a payload for a stage and mark it done
    pub fn set_artifact(
        &self,
        item_id: Uuid,
        stage: Stage,
        payload: Value,
    ) -> Result<StageOutcome, AppError> {
        self.with_item(item_id, |item| {
            let outcome = item.set_artifact(stage, Artifact::produced(payload));
            debug!(
                "Stored {} artifact for item {} (changed: {})",
                stage, item_id, outcome.changed
            );
            Ok(outcome)
        })
    }

    /// Clear a stage and everything after it
    pub fn clear_artifact(&self, item_id: Uuid, stage: Stage) -> Result<Vec<Stage>, AppError> {
        self.with_item(item_id, |item| {
            let cleared = item.clear_artifact(stage)?;
            debug!("Cleared stages {:?} for item {}", cleared, item_id);
            Ok(cleared)
        })
    }

    pub fn progress_summary(&self, item_id: Uuid) -> Result<ProgressSummary, AppError> {
        Ok(self.handle(item_id)?.lock().progress_summary())
    }

    /// Remove an item and its artifacts
    pub fn remove(&self, item_id: Uuid) -> Result<ContentItem, AppError> {
        let handle = self
            .items
            .write()
            .remove(&item_id)
            .ok_or_else(|| AppError::NotFound(format!("Content item {} not found", item_id)))?;
        let item = handle.lock().clone();
        Ok(item)
    }

    /// Copies of every item
    pub fn all(&self) -> Vec<ContentItem> {
        self.items
            .read()
            .values()
            .map(|handle| handle.lock().clone())
            .collect()
    }

    /// Drop every item
    pub fn clear(&self) {
        self.items.write().clear();
    }

    pub fn count(&self) -> usize {
        self.items.read().len()
    }
}

impl Default for ItemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::item::{ItemDefaults, NewItem};
    use crate::pipeline::stage;
    use serde_json::json;
    use std::thread;

    fn seeded_store() -> (ItemStore, Uuid) {
        let store = ItemStore::new();
        let item =
            ContentItem::create(Uuid::new_v4(), NewItem::new("Vid1"), ItemDefaults::default())
                .unwrap();
        let id = item.id;
        store.insert(item).unwrap();
        (store, id)
    }

    #[test]
    fn test_set_then_summary_round_trip() {
        let (store, id) = seeded_store();
        store.set_artifact(id, Stage::Narration, json!({"audio": "a.mp3"})).unwrap();

        let summary = store.progress_summary(id).unwrap();
        let narration = &summary.stages[Stage::Narration.index()];
        assert!(narration.done);
        assert!(narration.has_artifact);

        store.clear_artifact(id, Stage::Narration).unwrap();
        let summary = store.progress_summary(id).unwrap();
        assert!(summary.stages[Stage::Narration.index()..]
            .iter()
            .all(|s| !s.done && !s.has_artifact));
    }

    #[test]
    fn test_unknown_item_is_not_found() {
        let store = ItemStore::new();
        let result = store.set_artifact(Uuid::new_v4(), Stage::Script, json!(null));
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(matches!(store.remove(Uuid::new_v4()), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_duplicate_insert_conflicts() {
        let (store, id) = seeded_store();
        let copy = store.get(id).unwrap();
        assert!(matches!(store.insert(copy), Err(AppError::Conflict(_))));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_failed_clear_leaves_item_untouched() {
        let (store, id) = seeded_store();
        store.set_artifact(id, Stage::Script, json!("s")).unwrap();
        let before = store.get(id).unwrap();

        assert!(store.clear_artifact(id, Stage::ChannelReady).is_err());
        let after = store.get(id).unwrap();
        assert_eq!(before.status, after.status);
        assert_eq!(before.updated_at, after.updated_at);
    }

    #[test]
    fn test_concurrent_writers_keep_cascade_invariant() {
        let (store, id) = seeded_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for round in 0..50 {
                        let stage = Stage::ALL[1 + (worker + round) % 6];
                        if (worker + round) % 3 == 0 {
                            store.clear_artifact(id, stage).unwrap();
                        } else {
                            store.set_artifact(id, stage, json!(round)).unwrap();
                        }
                        let item = store.get(id).unwrap();
                        assert!(item.is_consistent());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let item = store.get(id).unwrap();
        assert!(item.is_consistent());
        assert!(item.status.is_done(Stage::ChannelReady));
        assert!(stage::current_stage_index(&item.status).is_some());
    }
}
