//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

mod channels;
mod items;

use crate::config::Settings;
use crate::models::{StageInfo, StageListResponse, SuccessResponse};
use crate::pipeline::Stage;
use crate::state::SharedState;
use axum::{
    http::{header, Method},
    routing::{get, post, put},
    Json, Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    // Build CORS layer
    let cors = build_cors_layer(settings);

    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .route("/api/stages", get(list_stages))

        // Channel routes
        .route(
            "/api/channels",
            post(channels::create_channel).get(channels::list_channels),
        )
        .route(
            "/api/channels/{id}",
            get(channels::get_channel)
                .patch(channels::update_channel)
                .delete(channels::delete_channel),
        )
        .route("/api/channels/{id}/progress", get(channels::channel_progress))
        .route("/api/channels/{id}/active-item", get(channels::active_item))
        .route(
            "/api/channels/{id}/items",
            post(channels::create_item).get(channels::list_items),
        )
        .route("/api/channels/{id}/import", post(channels::import_items))
        .route(
            "/api/channels/{id}/items/{item_id}",
            axum::routing::delete(channels::remove_item),
        )

        // Item routes
        .route("/api/items/{id}", get(items::get_item))
        .route("/api/items/{id}/progress", get(items::item_progress))
        .route(
            "/api/items/{id}/stages/{stage}",
            put(items::advance_stage).delete(items::reset_stage),
        )
        .route(
            "/api/items/{id}/stages/{stage}/override",
            post(items::override_stage),
        )
        .route("/api/items/{id}/activity", get(items::item_activity))
        .route("/api/activity", get(items::recent_activity))

        // Apply middleware and state
        .layer(middleware)
        .with_state(state)
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<_> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let headers = [header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT];

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers)
            .max_age(Duration::from_secs(3600))
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
            .max_age(Duration::from_secs(3600))
    }
}

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// The seven stages in pipeline order
async fn list_stages() -> Json<SuccessResponse<StageListResponse>> {
    let stages = Stage::ALL.iter().copied().map(StageInfo::from).collect();
    Json(SuccessResponse::with_data(
        "Pipeline stages",
        StageListResponse { stages },
    ))
}
