//! Content items
//!
//! A content item is one video under production. Its stage flags and
//! artifact slots are only ever changed together, so a stage is done
//! exactly when its slot holds an artifact.

use crate::error::AppError;
use crate::pipeline::artifacts::{Artifact, ArtifactSet};
use crate::pipeline::stage::{self, Stage, StageStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    LongForm,
    Short,
}

/// Channel defaults copied into an item when it is created
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDefaults {
    pub niche: String,
    pub persona: String,
    pub tone: String,
    pub forbidden_terms: Vec<String>,
}

/// Input for creating an item
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content_type: ContentType,
}

impl NewItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Item title must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Channel-level rollup category; each item belongs to exactly one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressBucket {
    Published,
    Rendered,
    Narrated,
    Thumbnailed,
    Scripted,
    CreatedOnly,
}

impl ProgressBucket {
    /// Highest-stage-wins: the latest done stage in the priority chain
    /// decides, whatever holes exist below it.
    pub fn classify(status: &StageStatus) -> Self {
        if status.is_done(Stage::Publish) {
            ProgressBucket::Published
        } else if status.is_done(Stage::Render) {
            ProgressBucket::Rendered
        } else if status.is_done(Stage::Narration) {
            ProgressBucket::Narrated
        } else if status.is_done(Stage::Thumbnail) {
            ProgressBucket::Thumbnailed
        } else if status.is_done(Stage::Script) {
            ProgressBucket::Scripted
        } else {
            ProgressBucket::CreatedOnly
        }
    }
}

/// A video under production
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub title: String,
    pub description: String,
    pub content_type: ContentType,
    pub defaults: ItemDefaults,
    pub status: StageStatus,
    pub artifacts: ArtifactSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a stage write did to the item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOutcome {
    pub stage: Stage,
    /// The payload differed from what was already stored
    pub changed: bool,
    /// The write moved the item from incomplete to complete
    pub became_complete: bool,
    pub current_stage_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageProgress {
    pub stage: Stage,
    pub label: &'static str,
    pub done: bool,
    pub has_artifact: bool,
}

/// Read-only projection used for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub item_id: Uuid,
    pub current_stage_index: Option<usize>,
    pub current_stage_label: &'static str,
    pub next_actionable: Option<Stage>,
    pub is_complete: bool,
    pub is_contiguous: bool,
    pub bucket: ProgressBucket,
    pub stages: Vec<StageProgress>,
}

impl ContentItem {
    /// Create an item for a channel. Only `channel_ready` starts done.
    pub fn create(
        channel_id: Uuid,
        input: NewItem,
        defaults: ItemDefaults,
    ) -> Result<Self, AppError> {
        input.validate()?;

        let now = Utc::now();
        let mut artifacts = ArtifactSet::default();
        artifacts.put(Stage::ChannelReady, Artifact::manual(Value::Null));

        Ok(Self {
            id: Uuid::new_v4(),
            channel_id,
            title: input.title.trim().to_string(),
            description: input.description,
            content_type: input.content_type,
            defaults,
            status: StageStatus::initial(),
            artifacts,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_complete(&self) -> bool {
        stage::is_complete(&self.status)
    }

    pub fn current_stage_index(&self) -> Option<usize> {
        stage::current_stage_index(&self.status)
    }

    pub fn bucket(&self) -> ProgressBucket {
        ProgressBucket::classify(&self.status)
    }

    /// Store an artifact in the stage slot and mark the stage done
    pub fn set_artifact(&mut self, stage: Stage, artifact: Artifact) -> StageOutcome {
        let was_complete = self.is_complete();
        let changed = !self
            .artifacts
            .get(stage)
            .is_some_and(|existing| existing.same_content(&artifact));

        self.artifacts.put(stage, artifact);
        self.status.set(stage, true);
        self.updated_at = Utc::now();

        StageOutcome {
            stage,
            changed,
            became_complete: !was_complete && self.is_complete(),
            current_stage_index: self.current_stage_index(),
        }
    }

    /// Clear a stage and every stage after it. Returns the stages that
    /// were done or held an artifact before the call.
    pub fn clear_artifact(&mut self, stage: Stage) -> Result<Vec<Stage>, AppError> {
        if stage == Stage::ChannelReady {
            return Err(AppError::InvalidTransition(
                "channel_ready cannot be reset while the item belongs to a channel".to_string(),
            ));
        }

        let mut cleared = Vec::new();
        for target in std::iter::once(stage).chain(stage.downstream().iter().copied()) {
            let had_artifact = self.artifacts.take(target).is_some();
            if had_artifact || self.status.is_done(target) {
                cleared.push(target);
            }
            self.status.set(target, false);
        }
        self.updated_at = Utc::now();
        Ok(cleared)
    }

    pub fn progress_summary(&self) -> ProgressSummary {
        let current = self.current_stage_index();
        ProgressSummary {
            item_id: self.id,
            current_stage_index: current,
            current_stage_label: stage::label_for(current),
            next_actionable: stage::next_actionable(&self.status),
            is_complete: self.is_complete(),
            is_contiguous: stage::is_contiguous(&self.status),
            bucket: self.bucket(),
            stages: Stage::ALL
                .iter()
                .map(|s| StageProgress {
                    stage: *s,
                    label: s.label(),
                    done: self.status.is_done(*s),
                    has_artifact: self.artifacts.has(*s),
                })
                .collect(),
        }
    }

    /// Stage flags and slots agree for every stage
    pub fn is_consistent(&self) -> bool {
        Stage::ALL
            .iter()
            .all(|s| self.status.is_done(*s) == self.artifacts.has(*s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn new_item(title: &str) -> ContentItem {
        ContentItem::create(Uuid::new_v4(), NewItem::new(title), ItemDefaults::default()).unwrap()
    }

    #[test]
    fn test_create_item_initial_state() {
        let item = new_item("  Vid1 ");
        assert_eq!(item.title, "Vid1");
        assert_eq!(item.current_stage_index(), Some(0));
        assert!(!item.is_complete());
        assert_eq!(item.bucket(), ProgressBucket::CreatedOnly);
        assert!(item.is_consistent());
        assert_eq!(item.created_at, item.updated_at);
    }

    #[test]
    fn test_create_rejects_blank_title() {
        let result = ContentItem::create(
            Uuid::new_v4(),
            NewItem::new("   "),
            ItemDefaults::default(),
        );
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_set_artifact_marks_stage_done() {
        let mut item = new_item("Vid1");
        let outcome = item.set_artifact(Stage::Script, Artifact::produced(json!({"hook": "h"})));

        assert!(outcome.changed);
        assert!(!outcome.became_complete);
        assert_eq!(outcome.current_stage_index, Some(1));
        assert_eq!(item.bucket(), ProgressBucket::Scripted);
        assert!(item.is_consistent());
    }

    #[test]
    fn test_set_artifact_twice_is_idempotent() {
        let mut item = new_item("Vid1");
        item.set_artifact(Stage::Script, Artifact::produced(json!({"v": 1})));
        let status = item.status;
        let payload = item.artifacts.get(Stage::Script).unwrap().payload.clone();

        let outcome = item.set_artifact(Stage::Script, Artifact::produced(json!({"v": 1})));
        assert!(!outcome.changed);
        assert_eq!(item.status, status);
        assert_eq!(item.artifacts.get(Stage::Script).unwrap().payload, payload);
    }

    #[test]
    fn test_clear_cascades_to_later_stages() {
        let mut item = new_item("Vid1");
        item.set_artifact(Stage::Script, Artifact::produced(json!("s")));
        item.set_artifact(Stage::Render, Artifact::produced(json!("r")));
        assert_eq!(item.current_stage_index(), Some(4));
        assert_eq!(item.bucket(), ProgressBucket::Rendered);

        let cleared = item.clear_artifact(Stage::Script).unwrap();
        assert_eq!(cleared, vec![Stage::Script, Stage::Render]);
        assert_eq!(item.current_stage_index(), Some(0));
        assert_eq!(item.bucket(), ProgressBucket::CreatedOnly);
        assert!(item.is_consistent());
    }

    #[test]
    fn test_clear_channel_ready_is_rejected() {
        let mut item = new_item("Vid1");
        item.set_artifact(Stage::Script, Artifact::produced(json!("s")));
        let before = item.status;

        let result = item.clear_artifact(Stage::ChannelReady);
        assert!(matches!(result, Err(AppError::InvalidTransition(_))));
        assert_eq!(item.status, before);
    }

    #[test]
    fn test_completing_every_stage() {
        let mut item = new_item("Vid1");
        let mut last = None;
        for stage in Stage::ALL.iter().skip(1) {
            last = Some(item.set_artifact(*stage, Artifact::produced(json!(stage.key()))));
        }
        assert!(last.unwrap().became_complete);
        assert!(item.is_complete());
        assert_eq!(item.bucket(), ProgressBucket::Published);

        item.clear_artifact(Stage::Analytics).unwrap();
        assert!(!item.is_complete());
        assert_eq!(item.bucket(), ProgressBucket::Published);
    }

    #[test]
    fn test_progress_summary_reports_artifacts() {
        let mut item = new_item("Vid1");
        item.set_artifact(Stage::Script, Artifact::produced(json!("s")));

        let summary = item.progress_summary();
        assert_eq!(summary.current_stage_label, "Script");
        assert_eq!(summary.next_actionable, Some(Stage::Thumbnail));
        assert!(summary.is_contiguous);
        let present: Vec<Stage> = summary
            .stages
            .iter()
            .filter(|s| s.has_artifact && s.done)
            .map(|s| s.stage)
            .collect();
        assert_eq!(present, vec![Stage::ChannelReady, Stage::Script]);
    }

    #[test]
    fn test_bucket_ignores_gaps() {
        let mut status = StageStatus::default();
        status.set(Stage::Narration, true);
        assert_eq!(ProgressBucket::classify(&status), ProgressBucket::Narrated);

        status.set(Stage::Analytics, true);
        assert_eq!(ProgressBucket::classify(&status), ProgressBucket::Narrated);
    }
}
