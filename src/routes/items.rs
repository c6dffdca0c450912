//! Item Routes
//!
//! Stage ingestion, resets, overrides and per-item reporting.

use crate::error::ApiResult;
use crate::models::{
    ActivityQuery, ActivityResponse, ItemResponse, OverrideRequest, ProgressResponse,
    StageOutcomeResponse, StageResetResponse, SuccessResponse,
};
use crate::pipeline::Stage;
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;
use uuid::Uuid;

const DEFAULT_ACTIVITY_LIMIT: usize = 50;
const MAX_ACTIVITY_LIMIT: usize = 500;

pub async fn get_item(
    State(state): State<SharedState>,
    Path(item_id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<ItemResponse>>> {
    let item = state.pipeline.get_item(item_id)?;
    Ok(Json(SuccessResponse::with_data("Item found", ItemResponse { item })))
}

pub async fn item_progress(
    State(state): State<SharedState>,
    Path(item_id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<ProgressResponse>>> {
    let progress = state.pipeline.progress_summary(item_id)?;
    Ok(Json(SuccessResponse::with_data(
        progress.current_stage_label,
        ProgressResponse { progress },
    )))
}

// =============================================================================
// STAGES
// =============================================================================

/// Store the request body as the stage's artifact
pub async fn advance_stage(
    State(state): State<SharedState>,
    Path((item_id, stage)): Path<(Uuid, String)>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<SuccessResponse<StageOutcomeResponse>>> {
    let stage = Stage::from_key(&stage)?;
    let outcome = state.pipeline.advance_stage(item_id, stage, payload)?;
    let message = if outcome.changed {
        format!("{} stored", stage.label())
    } else {
        format!("{} unchanged", stage.label())
    };
    Ok(Json(SuccessResponse::with_data(message, StageOutcomeResponse { outcome })))
}

/// Clear a stage and every later one
pub async fn reset_stage(
    State(state): State<SharedState>,
    Path((item_id, stage)): Path<(Uuid, String)>,
) -> ApiResult<Json<SuccessResponse<StageResetResponse>>> {
    let stage = Stage::from_key(&stage)?;
    let cleared = state.pipeline.reset_stage(item_id, stage)?;
    Ok(Json(SuccessResponse::with_data(
        format!("Cleared {} stage(s)", cleared.len()),
        StageResetResponse { cleared },
    )))
}

/// Mark a stage done or undone by hand
pub async fn override_stage(
    State(state): State<SharedState>,
    Path((item_id, stage)): Path<(Uuid, String)>,
    Json(req): Json<OverrideRequest>,
) -> ApiResult<Json<SuccessResponse<ProgressResponse>>> {
    let stage = Stage::from_key(&stage)?;
    let progress = state.pipeline.override_stage(item_id, stage, req.done)?;
    Ok(Json(SuccessResponse::with_data(
        format!("{} marked {}", stage.label(), if req.done { "done" } else { "undone" }),
        ProgressResponse { progress },
    )))
}

// =============================================================================
// ACTIVITY
// =============================================================================

pub async fn item_activity(
    State(state): State<SharedState>,
    Path(item_id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<ActivityResponse>>> {
    let entries = state.pipeline.item_activity(item_id)?;
    Ok(Json(SuccessResponse::with_data(
        format!("Found {} entries", entries.len()),
        ActivityResponse { entries },
    )))
}

/// Newest entries across the whole pipeline
pub async fn recent_activity(
    State(state): State<SharedState>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Json<SuccessResponse<ActivityResponse>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .min(MAX_ACTIVITY_LIMIT);
    let entries = state.pipeline.recent_activity(limit);
    Ok(Json(SuccessResponse::with_data(
        format!("Found {} entries", entries.len()),
        ActivityResponse { entries },
    )))
}
