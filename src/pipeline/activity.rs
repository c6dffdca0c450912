//! Activity log
//!
//! Bounded in-memory trail of pipeline mutations, newest last.

use crate::pipeline::stage::Stage;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

pub const DEFAULT_ACTIVITY_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    ItemCreated,
    ItemRemoved,
    StageAdvanced,
    StageReset,
    /// A later stage lost its artifact because an earlier one was reset
    StageCascaded,
    StageOverridden,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub channel_id: Uuid,
    pub item_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    pub action: ActivityAction,
}

impl ActivityEntry {
    pub fn new(
        channel_id: Uuid,
        item_id: Uuid,
        stage: Option<Stage>,
        action: ActivityAction,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            at: Utc::now(),
            channel_id,
            item_id,
            stage,
            action,
        }
    }
}

pub struct ActivityLog {
    entries: Mutex<VecDeque<ActivityEntry>>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_ACTIVITY_CAPACITY))),
            capacity,
        }
    }

    pub fn record(&self, entry: ActivityEntry) {
        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Most recent entries, newest first
    pub fn recent(&self, limit: usize) -> Vec<ActivityEntry> {
        self.entries.lock().iter().rev().take(limit).cloned().collect()
    }

    /// All retained entries for one item, oldest first
    pub fn for_item(&self, item_id: Uuid) -> Vec<ActivityEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.item_id == item_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVITY_CAPACITY)
    }
}
