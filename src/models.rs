//! Data models and DTOs (Data Transfer Objects)
//!
//! Contains all request/response structures used by the API.

use crate::pipeline::{
    ActivityEntry, Channel, ChannelUpdate, ContentItem, ContentType, NewChannel, NewItem,
    ProgressCounts, ProgressSummary, Stage, StageOutcome,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Generic success response
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// Message-only response (no data)
#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Request to create a channel
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateChannelRequest {
    #[validate(length(min = 1, max = 100, message = "Channel name must be between 1 and 100 characters"))]
    pub name: String,
    #[serde(default)]
    pub niche: String,
    #[serde(default)]
    pub persona: String,
    #[validate(length(max = 16, message = "Locale must be at most 16 characters"))]
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub forbidden_terms: Vec<String>,
}

impl From<CreateChannelRequest> for NewChannel {
    fn from(req: CreateChannelRequest) -> Self {
        NewChannel {
            name: req.name,
            niche: req.niche,
            persona: req.persona,
            locale: req.locale,
            tone: req.tone,
            forbidden_terms: req.forbidden_terms,
        }
    }
}

/// Partial update of channel defaults
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChannelRequest {
    #[validate(length(min = 1, max = 100, message = "Channel name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    pub niche: Option<String>,
    pub persona: Option<String>,
    #[validate(length(max = 16, message = "Locale must be at most 16 characters"))]
    pub locale: Option<String>,
    pub tone: Option<String>,
    pub forbidden_terms: Option<Vec<String>>,
}

impl From<UpdateChannelRequest> for ChannelUpdate {
    fn from(req: UpdateChannelRequest) -> Self {
        ChannelUpdate {
            name: req.name,
            niche: req.niche,
            persona: req.persona,
            locale: req.locale,
            tone: req.tone,
            forbidden_terms: req.forbidden_terms,
        }
    }
}

/// Request to create a content item
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content_type: ContentType,
}

impl From<CreateItemRequest> for NewItem {
    fn from(req: CreateItemRequest) -> Self {
        NewItem {
            title: req.title,
            description: req.description,
            content_type: req.content_type,
        }
    }
}

/// Bulk item import; all entries are created or none are
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImportItemsRequest {
    #[validate(
        length(min = 1, max = 500, message = "Import must contain between 1 and 500 items"),
        nested
    )]
    pub items: Vec<CreateItemRequest>,
}

/// Manual stage override
#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub done: bool,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

// =============================================================================
// RESPONSES
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageInfo {
    pub index: usize,
    pub key: &'static str,
    pub label: &'static str,
}

impl From<Stage> for StageInfo {
    fn from(stage: Stage) -> Self {
        Self {
            index: stage.index(),
            key: stage.key(),
            label: stage.label(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StageListResponse {
    pub stages: Vec<StageInfo>,
}

#[derive(Debug, Serialize)]
pub struct ChannelResponse {
    pub channel: Channel,
}

#[derive(Debug, Serialize)]
pub struct ChannelListResponse {
    pub channels: Vec<Channel>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDeletedResponse {
    pub channel_id: Uuid,
    pub items_removed: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProgressResponse {
    pub channel_id: Uuid,
    pub progress: ProgressCounts,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveItemResponse {
    pub item_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub item: ContentItem,
}

#[derive(Debug, Serialize)]
pub struct ItemListResponse {
    pub items: Vec<ContentItem>,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub progress: ProgressSummary,
}

#[derive(Debug, Serialize)]
pub struct StageOutcomeResponse {
    pub outcome: StageOutcome,
}

#[derive(Debug, Serialize)]
pub struct StageResetResponse {
    pub cleared: Vec<Stage>,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub entries: Vec<ActivityEntry>,
}
