//! Stage artifacts
//!
//! An [`Artifact`] wraps the opaque payload a collaborator handed back for
//! a stage. The core stores payloads verbatim and never parses them; the
//! typed records below exist so collaborators agree on a shape.

use crate::error::AppError;
use crate::pipeline::stage::{Stage, STAGE_COUNT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// How an artifact came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactOrigin {
    /// Produced by a collaborator and ingested through `advance_stage`
    Produced,
    /// Recorded by an operator override, payload may be null
    Manual,
}

/// Stored output of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub payload: Value,
    pub origin: ArtifactOrigin,
    pub stored_at: DateTime<Utc>,
}

impl Artifact {
    pub fn produced(payload: Value) -> Self {
        Self {
            payload,
            origin: ArtifactOrigin::Produced,
            stored_at: Utc::now(),
        }
    }

    pub fn manual(payload: Value) -> Self {
        Self {
            payload,
            origin: ArtifactOrigin::Manual,
            stored_at: Utc::now(),
        }
    }

    /// Same content, ignoring when it was stored
    pub fn same_content(&self, other: &Artifact) -> bool {
        self.payload == other.payload && self.origin == other.origin
    }
}

/// One optional slot per stage
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArtifactSet([Option<Artifact>; STAGE_COUNT]);

impl ArtifactSet {
    pub fn get(&self, stage: Stage) -> Option<&Artifact> {
        self.0[stage.index()].as_ref()
    }

    pub fn has(&self, stage: Stage) -> bool {
        self.0[stage.index()].is_some()
    }

    /// Put an artifact in the stage slot, returning the previous one
    pub fn put(&mut self, stage: Stage, artifact: Artifact) -> Option<Artifact> {
        self.0[stage.index()].replace(artifact)
    }

    pub fn take(&mut self, stage: Stage) -> Option<Artifact> {
        self.0[stage.index()].take()
    }

    pub fn present_stages(&self) -> Vec<Stage> {
        Stage::ALL.iter().copied().filter(|s| self.has(*s)).collect()
    }
}

// =============================================================================
// TYPED PAYLOADS
// =============================================================================

/// A record that belongs to exactly one stage
pub trait StagePayload: Serialize {
    const STAGE: Stage;

    /// Serialize into the opaque payload stored by the core
    fn into_payload(self) -> Result<Value, AppError>
    where
        Self: Sized,
    {
        serde_json::to_value(&self).map_err(|e| AppError::Internal(e.to_string()))
    }
}

/// Long-form script broken into named sections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptArtifact {
    pub title: String,
    pub hook: String,
    pub promise: String,
    pub structure: String,
    /// Section name -> paragraphs
    pub sections: BTreeMap<String, Vec<String>>,
    /// Section name -> one image prompt per paragraph
    pub image_prompts: BTreeMap<String, Vec<String>>,
    pub model: String,
    pub tokens_used: u32,
    pub generated_at: Option<DateTime<Utc>>,
}

impl StagePayload for ScriptArtifact {
    const STAGE: Stage = Stage::Script;
}

/// Reference to a generated image
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub section: String,
    pub index: usize,
    pub prompt: String,
    pub path: String,
    pub model: String,
    pub width: u32,
    pub height: u32,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailSet {
    pub images: Vec<ImageRef>,
    /// Index into `images` of the chosen thumbnail
    pub chosen: Option<usize>,
}

impl StagePayload for ThumbnailSet {
    const STAGE: Stage = Stage::Thumbnail;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationArtifact {
    pub audio_path: String,
    pub voice: String,
    pub duration_secs: Option<f64>,
    pub generated_at: DateTime<Utc>,
}

impl StagePayload for NarrationArtifact {
    const STAGE: Stage = Stage::Narration;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderArtifact {
    pub video_path: String,
    pub resolution: String,
    pub fps: u32,
    pub source_image: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl StagePayload for RenderArtifact {
    const STAGE: Stage = Stage::Render;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishMode {
    #[default]
    Manual,
    Api,
}

/// Where and how a video went live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub published_at: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
    pub mode: PublishMode,
}

impl PublishRecord {
    /// A manual publish record. The URL is required; tags are trimmed and
    /// empty ones dropped.
    pub fn new(
        url: &str,
        title: impl Into<String>,
        description: impl Into<String>,
        tags: &[&str],
        visibility: Visibility,
        published_at: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::InvalidInput(
                "A published video URL is required".to_string(),
            ));
        }
        Ok(Self {
            url: url.to_string(),
            title: title.into(),
            description: description.into(),
            tags: tags
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            visibility,
            published_at,
            recorded_at: Utc::now(),
            mode: PublishMode::Manual,
        })
    }
}

impl StagePayload for PublishRecord {
    const STAGE: Stage = Stage::Publish;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub captured_at: Option<DateTime<Utc>>,
}

impl StagePayload for AnalyticsSnapshot {
    const STAGE: Stage = Stage::Analytics;
}
