//! Channel Routes
//!
//! Channel CRUD, bulk item import and channel-level progress.

use crate::error::ApiResult;
use crate::models::{
    ActiveItemResponse, ChannelDeletedResponse, ChannelListResponse, ChannelProgressResponse,
    ChannelResponse, CreateChannelRequest, CreateItemRequest, ImportItemsRequest,
    ItemListResponse, ItemResponse, MessageResponse, SuccessResponse, UpdateChannelRequest,
};
use crate::pipeline::NewItem;
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

/// Create a channel
pub async fn create_channel(
    State(state): State<SharedState>,
    Json(req): Json<CreateChannelRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<ChannelResponse>>)> {
    req.validate()?;
    let channel = state.pipeline.create_channel(req.into())?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data("Channel created", ChannelResponse { channel })),
    ))
}

/// List channels, oldest first
pub async fn list_channels(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<ChannelListResponse>>> {
    let channels = state.pipeline.list_channels();
    Ok(Json(SuccessResponse::with_data(
        format!("Found {} channel(s)", channels.len()),
        ChannelListResponse { channels },
    )))
}

pub async fn get_channel(
    State(state): State<SharedState>,
    Path(channel_id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<ChannelResponse>>> {
    let channel = state.pipeline.get_channel(channel_id)?;
    Ok(Json(SuccessResponse::with_data("Channel found", ChannelResponse { channel })))
}

/// Update channel defaults. Existing items keep the values they were
/// created with.
pub async fn update_channel(
    State(state): State<SharedState>,
    Path(channel_id): Path<Uuid>,
    Json(req): Json<UpdateChannelRequest>,
) -> ApiResult<Json<SuccessResponse<ChannelResponse>>> {
    req.validate()?;
    let channel = state.pipeline.update_channel_defaults(channel_id, req.into())?;
    Ok(Json(SuccessResponse::with_data("Channel updated", ChannelResponse { channel })))
}

/// Delete a channel and every item it owns
pub async fn delete_channel(
    State(state): State<SharedState>,
    Path(channel_id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<ChannelDeletedResponse>>> {
    let items_removed = state.pipeline.delete_channel(channel_id)?;
    Ok(Json(SuccessResponse::with_data(
        "Channel deleted",
        ChannelDeletedResponse {
            channel_id,
            items_removed,
        },
    )))
}

pub async fn channel_progress(
    State(state): State<SharedState>,
    Path(channel_id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<ChannelProgressResponse>>> {
    let progress = state.pipeline.aggregate_progress(channel_id)?;
    Ok(Json(SuccessResponse::with_data(
        format!("{} of {} item(s) complete", progress.complete, progress.total),
        ChannelProgressResponse {
            channel_id,
            progress,
        },
    )))
}

/// The item a user should keep working on
pub async fn active_item(
    State(state): State<SharedState>,
    Path(channel_id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<ActiveItemResponse>>> {
    let item_id = state.pipeline.select_active_item(channel_id)?;
    let message = if item_id.is_some() {
        "Active item selected"
    } else {
        "Channel has no items"
    };
    Ok(Json(SuccessResponse::with_data(message, ActiveItemResponse { item_id })))
}

// =============================================================================
// ITEMS OF A CHANNEL
// =============================================================================

pub async fn create_item(
    State(state): State<SharedState>,
    Path(channel_id): Path<Uuid>,
    Json(req): Json<CreateItemRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<ItemResponse>>)> {
    req.validate()?;
    let item = state.pipeline.create_item(channel_id, req.into())?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data("Item created", ItemResponse { item })),
    ))
}

/// Items of a channel, in creation order
pub async fn list_items(
    State(state): State<SharedState>,
    Path(channel_id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<ItemListResponse>>> {
    let items = state.pipeline.list_items(channel_id)?;
    Ok(Json(SuccessResponse::with_data(
        format!("Found {} item(s)", items.len()),
        ItemListResponse { items },
    )))
}

/// Bulk import
pub async fn import_items(
    State(state): State<SharedState>,
    Path(channel_id): Path<Uuid>,
    Json(req): Json<ImportItemsRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<ItemListResponse>>)> {
    req.validate()?;
    let inputs: Vec<NewItem> = req.items.into_iter().map(NewItem::from).collect();
    let items = state.pipeline.import_items(channel_id, inputs)?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            format!("Imported {} item(s)", items.len()),
            ItemListResponse { items },
        )),
    ))
}

pub async fn remove_item(
    State(state): State<SharedState>,
    Path((channel_id, item_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<MessageResponse>> {
    state.pipeline.remove_item(channel_id, item_id)?;
    Ok(Json(MessageResponse::new("Item removed")))
}
