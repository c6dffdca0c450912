//! Pipeline Coordinator
//!
//! The orchestration surface over the registry, the item store and the
//! activity log. Every operation that touches more than one of them goes
//! through here, and every artifact write goes through the store's
//! `set_artifact`/`clear_artifact` so stage flags and slots never diverge.
//!
//! Operations that change which items exist (create, import, remove,
//! delete channel) and whole-pipeline snapshots hold the structure lock
//! for their full duration, so membership and the store are never seen
//! half-updated. Lock order is always structure, registry, store map,
//! then item.

use crate::error::{invalid_input, not_found, AppError};
use crate::persist::PipelineSnapshot;
use crate::pipeline::activity::{ActivityAction, ActivityEntry, ActivityLog};
use crate::pipeline::artifacts::Artifact;
use crate::pipeline::item::{ContentItem, NewItem, ProgressSummary, StageOutcome};
use crate::pipeline::producer::ArtifactProducer;
use crate::pipeline::registry::{Channel, ChannelRegistry, ChannelUpdate, NewChannel, ProgressCounts};
use crate::pipeline::stage::{self, Stage};
use crate::pipeline::store::ItemStore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Whether a stage may be completed before its prerequisites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainMode {
    /// Any stage may be completed at any time; gaps are tolerated
    #[default]
    Permissive,
    /// A stage may only be completed once every earlier stage is done
    Strict,
}

impl FromStr for ChainMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(ChainMode::Permissive),
            "strict" => Ok(ChainMode::Strict),
            other => Err(format!(
                "unknown chain mode '{}' (expected 'permissive' or 'strict')",
                other
            )),
        }
    }
}

impl fmt::Display for ChainMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainMode::Permissive => write!(f, "permissive"),
            ChainMode::Strict => write!(f, "strict"),
        }
    }
}

pub struct PipelineCoordinator {
    registry: ChannelRegistry,
    store: ItemStore,
    activity: ActivityLog,
    mode: ChainMode,
    structure: Mutex<()>,
}

impl PipelineCoordinator {
    pub fn new(mode: ChainMode, activity_capacity: usize) -> Self {
        Self {
            registry: ChannelRegistry::new(),
            store: ItemStore::new(),
            activity: ActivityLog::new(activity_capacity),
            mode,
            structure: Mutex::new(()),
        }
    }

    pub fn mode(&self) -> ChainMode {
        self.mode
    }

    fn log(&self, item: &ContentItem, stage: Option<Stage>, action: ActivityAction) {
        self.activity
            .record(ActivityEntry::new(item.channel_id, item.id, stage, action));
    }

    fn check_chain(&self, item: &ContentItem, stage: Stage) -> Result<(), AppError> {
        if self.mode == ChainMode::Permissive {
            return Ok(());
        }
        let missing = stage::missing_prerequisites(&item.status, stage);
        if missing.is_empty() {
            return Ok(());
        }
        let keys: Vec<&str> = missing.iter().map(|s| s.key()).collect();
        warn!(
            "Rejected {} for item {}: missing prerequisites {:?}",
            stage, item.id, keys
        );
        Err(AppError::InvalidTransition(format!(
            "Cannot complete '{}' before: {}",
            stage,
            keys.join(", ")
        )))
    }

    // =========================================================================
    // CHANNELS
    // =========================================================================

    pub fn create_channel(&self, input: NewChannel) -> Result<Channel, AppError> {
        self.registry.create_channel(input)
    }

    pub fn get_channel(&self, channel_id: Uuid) -> Result<Channel, AppError> {
        self.registry.get_channel(channel_id)
    }

    pub fn list_channels(&self) -> Vec<Channel> {
        self.registry.list_channels()
    }

    pub fn update_channel_defaults(
        &self,
        channel_id: Uuid,
        update: ChannelUpdate,
    ) -> Result<Channel, AppError> {
        self.registry.update_channel_defaults(channel_id, update)
    }

    /// Delete a channel together with every item it owns
    pub fn delete_channel(&self, channel_id: Uuid) -> Result<usize, AppError> {
        let _structure = self.structure.lock();
        let item_ids = self.registry.delete_channel(channel_id)?;
        let mut removed = 0;
        for item_id in item_ids {
            match self.store.remove(item_id) {
                Ok(item) => {
                    self.log(&item, None, ActivityAction::ItemRemoved);
                    removed += 1;
                }
                Err(_) => warn!("Channel {} listed missing item {}", channel_id, item_id),
            }
        }
        Ok(removed)
    }

    pub fn aggregate_progress(&self, channel_id: Uuid) -> Result<ProgressCounts, AppError> {
        self.registry.aggregate_progress(channel_id, &self.store)
    }

    /// Resolve the item a caller should be working on: the most recently
    /// touched incomplete item, else the most recently touched item.
    pub fn select_active_item(&self, channel_id: Uuid) -> Result<Option<Uuid>, AppError> {
        let items = self.list_items(channel_id)?;
        let latest_incomplete = items
            .iter()
            .filter(|item| !item.is_complete())
            .max_by_key(|item| item.updated_at);
        Ok(latest_incomplete
            .or_else(|| items.iter().max_by_key(|item| item.updated_at))
            .map(|item| item.id))
    }

    // =========================================================================
    // ITEMS
    // =========================================================================

    /// Create an item seeded with the channel's current defaults
    pub fn create_item(&self, channel_id: Uuid, input: NewItem) -> Result<ContentItem, AppError> {
        let mut items = self.import_items(channel_id, vec![input])?;
        items
            .pop()
            .ok_or_else(|| AppError::Internal("Item creation returned nothing".to_string()))
    }

    /// Create several items in one go. Every entry is validated first;
    /// if any is invalid nothing is created.
    pub fn import_items(
        &self,
        channel_id: Uuid,
        inputs: Vec<NewItem>,
    ) -> Result<Vec<ContentItem>, AppError> {
        let _structure = self.structure.lock();
        let channel = self.registry.get_channel(channel_id)?;
        for (index, input) in inputs.iter().enumerate() {
            input.validate().map_err(|e| match e {
                AppError::InvalidInput(msg) => {
                    AppError::InvalidInput(format!("Item #{}: {}", index + 1, msg))
                }
                other => other,
            })?;
        }

        let defaults = channel.item_defaults();
        let items = inputs
            .into_iter()
            .map(|input| ContentItem::create(channel_id, input, defaults.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        let ids: Vec<Uuid> = items.iter().map(|item| item.id).collect();

        self.registry.add_items(channel_id, &ids)?;
        for item in &items {
            if let Err(e) = self.store.insert(item.clone()) {
                for id in &ids {
                    let _ = self.registry.remove_item(channel_id, *id);
                    let _ = self.store.remove(*id);
                }
                return Err(e);
            }
            self.log(item, None, ActivityAction::ItemCreated);
        }

        info!("Created {} item(s) in channel '{}'", items.len(), channel.name);
        Ok(items)
    }

    pub fn get_item(&self, item_id: Uuid) -> Result<ContentItem, AppError> {
        self.store.get(item_id)
    }

    /// Items of a channel, in the order they were added
    pub fn list_items(&self, channel_id: Uuid) -> Result<Vec<ContentItem>, AppError> {
        let ids = self.registry.item_ids(channel_id)?;
        Ok(self.store.get_many(&ids))
    }

    /// Explicitly delete an item and its artifacts
    pub fn remove_item(&self, channel_id: Uuid, item_id: Uuid) -> Result<(), AppError> {
        let _structure = self.structure.lock();
        self.registry.remove_item(channel_id, item_id)?;
        let item = self.store.remove(item_id)?;
        self.log(&item, None, ActivityAction::ItemRemoved);
        info!("Removed item '{}' (id: {})", item.title, item.id);
        Ok(())
    }

    pub fn progress_summary(&self, item_id: Uuid) -> Result<ProgressSummary, AppError> {
        self.store.progress_summary(item_id)
    }

    pub fn label_for(&self, index: Option<usize>) -> &'static str {
        stage::label_for(index)
    }

    // =========================================================================
    // STAGES
    // =========================================================================

    /// Ingest a collaborator's payload for a stage
    pub fn advance_stage(
        &self,
        item_id: Uuid,
        stage: Stage,
        payload: Value,
    ) -> Result<StageOutcome, AppError> {
        let (outcome, item) = self.store.with_item(item_id, |item| {
            self.check_chain(item, stage)?;
            let outcome = item.set_artifact(stage, Artifact::produced(payload));
            Ok((outcome, item.clone()))
        })?;

        self.log(&item, Some(stage), ActivityAction::StageAdvanced);
        debug!("Advanced item {} to {}", item_id, stage);
        if outcome.became_complete {
            info!("Item '{}' (id: {}) is complete", item.title, item.id);
        }
        Ok(outcome)
    }

    /// Clear a stage and cascade to every later one
    pub fn reset_stage(&self, item_id: Uuid, stage: Stage) -> Result<Vec<Stage>, AppError> {
        self.reset_with(item_id, stage, ActivityAction::StageReset)
    }

    fn reset_with(
        &self,
        item_id: Uuid,
        stage: Stage,
        action: ActivityAction,
    ) -> Result<Vec<Stage>, AppError> {
        let (cleared, item) = self.store.with_item(item_id, |item| {
            let cleared = item.clear_artifact(stage)?;
            Ok((cleared, item.clone()))
        })?;

        self.log(&item, Some(stage), action);
        for later in cleared.iter().filter(|s| **s != stage) {
            self.log(&item, Some(*later), ActivityAction::StageCascaded);
        }
        debug!("Reset item {} from {} (cleared {:?})", item_id, stage, cleared);
        Ok(cleared)
    }

    /// Manual status override. Marking done records a manual artifact
    /// with a null payload; marking undone is a cascading reset.
    pub fn override_stage(
        &self,
        item_id: Uuid,
        stage: Stage,
        done: bool,
    ) -> Result<ProgressSummary, AppError> {
        if done {
            let item = self.store.with_item(item_id, |item| {
                self.check_chain(item, stage)?;
                if !item.status.is_done(stage) {
                    item.set_artifact(stage, Artifact::manual(Value::Null));
                }
                Ok(item.clone())
            })?;
            self.log(&item, Some(stage), ActivityAction::StageOverridden);
        } else {
            self.reset_with(item_id, stage, ActivityAction::StageOverridden)?;
        }
        self.store.progress_summary(item_id)
    }

    /// Ask a collaborator for a stage payload, then ingest it. The item is
    /// not locked while the collaborator runs and stays untouched if it
    /// fails.
    pub async fn produce_and_advance(
        &self,
        producer: &dyn ArtifactProducer,
        item_id: Uuid,
        stage: Stage,
        request: Value,
    ) -> Result<StageOutcome, AppError> {
        if !producer.supports(stage) {
            return Err(invalid_input(format!(
                "Producer '{}' cannot produce '{}' artifacts",
                producer.name(),
                stage
            )));
        }
        let item = self.store.get(item_id)?;
        self.check_chain(&item, stage)?;

        let payload = producer
            .produce_artifact(stage, request)
            .await
            .map_err(|e| AppError::Collaborator(format!("{}: {:#}", producer.name(), e)))?;

        self.advance_stage(item_id, stage, payload)
    }

    // =========================================================================
    // ACTIVITY
    // =========================================================================

    pub fn recent_activity(&self, limit: usize) -> Vec<ActivityEntry> {
        self.activity.recent(limit)
    }

    pub fn item_activity(&self, item_id: Uuid) -> Result<Vec<ActivityEntry>, AppError> {
        if !self.store.contains(item_id) {
            return Err(not_found(format!("Content item {} not found", item_id)));
        }
        Ok(self.activity.for_item(item_id))
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    /// Copy of the whole pipeline, one record per channel and per item
    pub fn snapshot(&self) -> PipelineSnapshot {
        let _structure = self.structure.lock();
        let channels = self.registry.list_channels();
        let mut items = self.store.all();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        PipelineSnapshot::new(channels, items)
    }

    /// Replace the whole pipeline with a snapshot. The snapshot is checked
    /// in full before anything is replaced.
    pub fn restore(&self, snapshot: PipelineSnapshot) -> Result<(), AppError> {
        validate_snapshot(&snapshot)?;

        let _structure = self.structure.lock();
        self.registry.clear();
        self.store.clear();
        let (channel_count, item_count) = (snapshot.channels.len(), snapshot.items.len());
        for channel in snapshot.channels {
            self.registry.restore(channel);
        }
        for item in snapshot.items {
            self.store.insert(item)?;
        }
        info!("Restored {} channel(s) and {} item(s)", channel_count, item_count);
        Ok(())
    }
}

impl Default for PipelineCoordinator {
    fn default() -> Self {
        Self::new(
            ChainMode::default(),
            crate::pipeline::activity::DEFAULT_ACTIVITY_CAPACITY,
        )
    }
}

fn validate_snapshot(snapshot: &PipelineSnapshot) -> Result<(), AppError> {
    let mut owner: HashMap<Uuid, Uuid> = HashMap::new();
    for channel in &snapshot.channels {
        for item_id in &channel.item_ids {
            if owner.insert(*item_id, channel.id).is_some() {
                return Err(AppError::InvalidInput(format!(
                    "Item {} is listed by more than one channel",
                    item_id
                )));
            }
        }
    }

    let mut seen = HashSet::new();
    for item in &snapshot.items {
        if !seen.insert(item.id) {
            return Err(AppError::InvalidInput(format!("Duplicate item {}", item.id)));
        }
        if owner.get(&item.id) != Some(&item.channel_id) {
            return Err(AppError::InvalidInput(format!(
                "Item {} is not listed by its channel {}",
                item.id, item.channel_id
            )));
        }
        if !item.is_consistent() {
            return Err(AppError::InvalidInput(format!(
                "Item {} has stage flags that disagree with its artifacts",
                item.id
            )));
        }
        if !item.status.is_done(Stage::ChannelReady) {
            return Err(AppError::InvalidInput(format!(
                "Item {} is missing its channel_ready stage",
                item.id
            )));
        }
    }

    if owner.len() != seen.len() {
        return Err(AppError::InvalidInput(
            "A channel lists an item that is not in the snapshot".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::item::ProgressBucket;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn demo() -> (PipelineCoordinator, Uuid, Uuid) {
        demo_with(ChainMode::Permissive)
    }

    fn demo_with(mode: ChainMode) -> (PipelineCoordinator, Uuid, Uuid) {
        let coordinator = PipelineCoordinator::new(mode, 100);
        let channel = coordinator
            .create_channel(NewChannel {
                name: "Demo".to_string(),
                niche: "history".to_string(),
                persona: "curious adults".to_string(),
                tone: "warm".to_string(),
                ..Default::default()
            })
            .unwrap();
        let item = coordinator
            .create_item(channel.id, NewItem::new("Vid1"))
            .unwrap();
        (coordinator, channel.id, item.id)
    }

    fn bucket_of(coordinator: &PipelineCoordinator, item_id: Uuid) -> ProgressBucket {
        coordinator.progress_summary(item_id).unwrap().bucket
    }

    #[test]
    fn test_scenario_create() {
        let (coordinator, _, item_id) = demo();
        let summary = coordinator.progress_summary(item_id).unwrap();
        assert_eq!(summary.current_stage_index, Some(0));
        assert_eq!(summary.current_stage_label, "Channel ready");
        assert!(!summary.is_complete);
    }

    #[test]
    fn test_scenario_script() {
        let (coordinator, _, item_id) = demo();
        coordinator
            .advance_stage(item_id, Stage::Script, json!({"sections": {}}))
            .unwrap();
        let summary = coordinator.progress_summary(item_id).unwrap();
        assert_eq!(summary.current_stage_index, Some(1));
        assert_eq!(summary.bucket, ProgressBucket::Scripted);
    }

    #[test]
    fn test_scenario_skip_then_clear() {
        let (coordinator, channel_id, item_id) = demo();
        coordinator.advance_stage(item_id, Stage::Script, json!("s")).unwrap();
        coordinator.advance_stage(item_id, Stage::Render, json!("r")).unwrap();

        let summary = coordinator.progress_summary(item_id).unwrap();
        assert_eq!(summary.current_stage_index, Some(4));
        assert_eq!(summary.bucket, ProgressBucket::Rendered);
        assert!(!summary.is_contiguous);

        let cleared = coordinator.reset_stage(item_id, Stage::Script).unwrap();
        assert_eq!(cleared, vec![Stage::Script, Stage::Render]);
        let summary = coordinator.progress_summary(item_id).unwrap();
        assert!(summary.stages[1..].iter().all(|s| !s.done && !s.has_artifact));
        assert_eq!(summary.bucket, ProgressBucket::CreatedOnly);

        let counts = coordinator.aggregate_progress(channel_id).unwrap();
        assert_eq!(counts.created_only, 1);
    }

    #[test]
    fn test_scenario_complete() {
        let (coordinator, _, item_id) = demo();
        let mut became_complete = false;
        for stage in Stage::ALL {
            let outcome = coordinator.advance_stage(item_id, stage, json!(stage.key())).unwrap();
            became_complete |= outcome.became_complete;
        }
        assert!(became_complete);
        let summary = coordinator.progress_summary(item_id).unwrap();
        assert!(summary.is_complete);
        assert_eq!(summary.bucket, ProgressBucket::Published);
    }

    #[test]
    fn test_strict_mode_rejects_skip() {
        let (coordinator, _, item_id) = demo_with(ChainMode::Strict);
        coordinator.advance_stage(item_id, Stage::Script, json!("s")).unwrap();
        let before = coordinator.get_item(item_id).unwrap();

        let result = coordinator.advance_stage(item_id, Stage::Render, json!("r"));
        assert!(matches!(result, Err(AppError::InvalidTransition(_))));

        let after = coordinator.get_item(item_id).unwrap();
        assert_eq!(after.status, before.status);
        assert_eq!(after.updated_at, before.updated_at);
        assert!(!after.artifacts.has(Stage::Render));
    }

    #[test]
    fn test_strict_mode_allows_in_order() {
        let (coordinator, _, item_id) = demo_with(ChainMode::Strict);
        for stage in &Stage::ALL[1..] {
            coordinator.advance_stage(item_id, *stage, json!(null)).unwrap();
        }
        assert!(coordinator.get_item(item_id).unwrap().is_complete());
    }

    #[test]
    fn test_no_hole_survives_cascade() {
        let (coordinator, _, item_id) = demo();
        let script = [
            (Stage::Narration, true),
            (Stage::Publish, true),
            (Stage::Thumbnail, false),
            (Stage::Analytics, true),
            (Stage::Script, true),
            (Stage::Script, false),
            (Stage::Render, true),
        ];
        for (stage, set) in script {
            if set {
                coordinator.advance_stage(item_id, stage, json!(1)).unwrap();
            } else {
                coordinator.reset_stage(item_id, stage).unwrap();
                let item = coordinator.get_item(item_id).unwrap();
                for later in stage.downstream() {
                    assert!(!item.status.is_done(*later));
                    assert!(!item.artifacts.has(*later));
                }
            }
            assert!(coordinator.get_item(item_id).unwrap().is_consistent());
        }
    }

    #[test]
    fn test_channel_defaults_are_copied_not_shared() {
        let (coordinator, channel_id, item_id) = demo();
        coordinator
            .update_channel_defaults(
                channel_id,
                ChannelUpdate {
                    tone: Some("urgent".to_string()),
                    niche: Some("finance".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let old = coordinator.get_item(item_id).unwrap();
        assert_eq!(old.defaults.tone, "warm");
        assert_eq!(old.defaults.niche, "history");

        let fresh = coordinator.create_item(channel_id, NewItem::new("Vid2")).unwrap();
        assert_eq!(fresh.defaults.tone, "urgent");
        assert_eq!(fresh.defaults.persona, "curious adults");
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        let (coordinator, channel_id, _) = demo();
        let result = coordinator.import_items(
            channel_id,
            vec![NewItem::new("Vid2"), NewItem::new(" "), NewItem::new("Vid4")],
        );
        match result {
            Err(AppError::InvalidInput(msg)) => assert!(msg.starts_with("Item #2")),
            other => panic!("expected invalid input, got {:?}", other),
        }
        assert_eq!(coordinator.list_items(channel_id).unwrap().len(), 1);

        let imported = coordinator
            .import_items(channel_id, vec![NewItem::new("Vid2"), NewItem::new("Vid3")])
            .unwrap();
        assert_eq!(imported.len(), 2);
        let titles: Vec<String> = coordinator
            .list_items(channel_id)
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["Vid1", "Vid2", "Vid3"]);
    }

    #[test]
    fn test_create_item_unknown_channel() {
        let coordinator = PipelineCoordinator::default();
        let result = coordinator.create_item(Uuid::new_v4(), NewItem::new("x"));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_remove_item_drops_artifacts_and_membership() {
        let (coordinator, channel_id, item_id) = demo();
        coordinator.advance_stage(item_id, Stage::Script, json!("s")).unwrap();
        coordinator.remove_item(channel_id, item_id).unwrap();

        assert!(matches!(coordinator.get_item(item_id), Err(AppError::NotFound(_))));
        assert!(coordinator.list_items(channel_id).unwrap().is_empty());
        assert_eq!(coordinator.aggregate_progress(channel_id).unwrap().total, 0);
    }

    #[test]
    fn test_delete_channel_drops_items() {
        let (coordinator, channel_id, item_id) = demo();
        assert_eq!(coordinator.delete_channel(channel_id).unwrap(), 1);
        assert!(coordinator.get_item(item_id).is_err());
        assert!(coordinator.list_channels().is_empty());
    }

    #[test]
    fn test_create_racing_delete_leaves_no_orphans() {
        use std::sync::Arc;
        use std::thread;

        let coordinator = Arc::new(PipelineCoordinator::default());
        for _ in 0..20 {
            let channel_id = coordinator.create_channel(NewChannel::named("Race")).unwrap().id;

            let creator = {
                let coordinator = Arc::clone(&coordinator);
                thread::spawn(move || {
                    for n in 0..50 {
                        let _ = coordinator.create_item(channel_id, NewItem::new(format!("Vid{}", n)));
                    }
                })
            };
            let deleter = {
                let coordinator = Arc::clone(&coordinator);
                thread::spawn(move || {
                    while coordinator.delete_channel(channel_id).is_err() {
                        thread::yield_now();
                    }
                })
            };
            creator.join().unwrap();
            deleter.join().unwrap();

            let members: usize = coordinator
                .list_channels()
                .iter()
                .map(|c| c.item_ids.len())
                .sum();
            assert_eq!(coordinator.store.count(), members);
        }

        let restored = PipelineCoordinator::default();
        restored.restore(coordinator.snapshot()).unwrap();
    }

    #[test]
    fn test_select_active_item() {
        let (coordinator, channel_id, first) = demo();
        let second = coordinator.create_item(channel_id, NewItem::new("Vid2")).unwrap().id;
        coordinator.advance_stage(first, Stage::Script, json!("s")).unwrap();
        assert_eq!(coordinator.select_active_item(channel_id).unwrap(), Some(first));

        for stage in Stage::ALL {
            coordinator.advance_stage(first, stage, json!(null)).unwrap();
        }
        assert_eq!(coordinator.select_active_item(channel_id).unwrap(), Some(second));

        let empty = coordinator.create_channel(NewChannel::named("Empty")).unwrap();
        assert_eq!(coordinator.select_active_item(empty.id).unwrap(), None);
        assert!(coordinator.select_active_item(Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_override_stage() {
        let (coordinator, _, item_id) = demo();
        let summary = coordinator.override_stage(item_id, Stage::Publish, true).unwrap();
        assert_eq!(summary.bucket, ProgressBucket::Published);
        let item = coordinator.get_item(item_id).unwrap();
        assert_eq!(
            item.artifacts.get(Stage::Publish).map(|a| a.origin),
            Some(crate::pipeline::artifacts::ArtifactOrigin::Manual)
        );

        let summary = coordinator.override_stage(item_id, Stage::Publish, false).unwrap();
        assert_eq!(summary.bucket, ProgressBucket::CreatedOnly);
        assert!(coordinator.get_item(item_id).unwrap().is_consistent());
    }

    #[test]
    fn test_activity_records_cascade() {
        let (coordinator, _, item_id) = demo();
        coordinator.advance_stage(item_id, Stage::Script, json!("s")).unwrap();
        coordinator.advance_stage(item_id, Stage::Thumbnail, json!("t")).unwrap();
        coordinator.reset_stage(item_id, Stage::Script).unwrap();

        let actions: Vec<(ActivityAction, Option<Stage>)> = coordinator
            .item_activity(item_id)
            .unwrap()
            .iter()
            .map(|e| (e.action, e.stage))
            .collect();
        assert_eq!(
            actions,
            vec![
                (ActivityAction::ItemCreated, None),
                (ActivityAction::StageAdvanced, Some(Stage::Script)),
                (ActivityAction::StageAdvanced, Some(Stage::Thumbnail)),
                (ActivityAction::StageReset, Some(Stage::Script)),
                (ActivityAction::StageCascaded, Some(Stage::Thumbnail)),
            ]
        );
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let (coordinator, channel_id, item_id) = demo();
        coordinator.advance_stage(item_id, Stage::Script, json!({"hook": "h"})).unwrap();
        let snapshot = coordinator.snapshot();

        let restored = PipelineCoordinator::default();
        restored.restore(snapshot).unwrap();
        assert_eq!(
            restored.progress_summary(item_id).unwrap(),
            coordinator.progress_summary(item_id).unwrap()
        );
        assert_eq!(
            restored.aggregate_progress(channel_id).unwrap(),
            coordinator.aggregate_progress(channel_id).unwrap()
        );
    }

    #[test]
    fn test_restore_rejects_inconsistent_item() {
        let (coordinator, _, item_id) = demo();
        let mut snapshot = coordinator.snapshot();
        snapshot.items[0].status.set(Stage::Render, true);

        let target = PipelineCoordinator::default();
        assert!(matches!(target.restore(snapshot), Err(AppError::InvalidInput(_))));
        assert_eq!(target.list_channels().len(), 0);
        assert!(coordinator.get_item(item_id).is_ok());
    }

    struct EchoProducer;

    #[async_trait]
    impl ArtifactProducer for EchoProducer {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn supports(&self, stage: Stage) -> bool {
            stage == Stage::Narration
        }

        async fn produce_artifact(&self, _stage: Stage, request: Value) -> anyhow::Result<Value> {
            if request.get("fail").is_some() {
                anyhow::bail!("engine unavailable");
            }
            Ok(json!({ "audioPath": "full.mp3", "request": request }))
        }
    }

    #[tokio::test]
    async fn test_produce_and_advance() {
        let (coordinator, _, item_id) = demo();
        let outcome = coordinator
            .produce_and_advance(&EchoProducer, item_id, Stage::Narration, json!({"voice": "v"}))
            .await
            .unwrap();
        assert_eq!(outcome.current_stage_index, Some(3));

        let item = coordinator.get_item(item_id).unwrap();
        assert_eq!(
            item.artifacts.get(Stage::Narration).unwrap().payload["audioPath"],
            json!("full.mp3")
        );
    }

    #[test]
    fn test_failed_producer_leaves_state() {
        let (coordinator, _, item_id) = demo();
        let before = coordinator.get_item(item_id).unwrap();

        let result = tokio_test::block_on(coordinator.produce_and_advance(
            &EchoProducer,
            item_id,
            Stage::Narration,
            json!({"fail": true}),
        ));
        assert!(matches!(result, Err(AppError::Collaborator(_))));

        let unsupported = tokio_test::block_on(coordinator.produce_and_advance(
            &EchoProducer,
            item_id,
            Stage::Render,
            json!({}),
        ));
        assert!(matches!(unsupported, Err(AppError::InvalidInput(_))));

        let after = coordinator.get_item(item_id).unwrap();
        assert_eq!(after.status, before.status);
        assert_eq!(after.updated_at, before.updated_at);
    }
}
