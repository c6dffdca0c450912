//! ReelFlow API - Video Production Pipeline
//!
//! Tracks channels and their videos through script, thumbnails,
//! narration, render, publication and analytics.
//!
//! When `PIPELINE_DATA_FILE` is set the pipeline is loaded from it at
//! start and written back on graceful shutdown.

use reelflow::config::Settings;
use reelflow::error::AppError;
use reelflow::persist;
use reelflow::routes::create_router;
use reelflow::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting ReelFlow - Video Production Pipeline...");

    // Load configuration
    let settings = Settings::load().map_err(AppError::from)?;
    info!(
        "📋 Configuration loaded (chain mode: {}, activity capacity: {})",
        settings.pipeline.chain_mode, settings.pipeline.activity_capacity
    );

    let state = Arc::new(AppState::new(&settings));

    match &state.data_file {
        Some(path) => {
            let snapshot = persist::load_from(path)?;
            state.pipeline.restore(snapshot)?;
            info!("📂 Pipeline loaded from {}", path.display());
        }
        None => warn!("⚠️  PIPELINE_DATA_FILE not set, pipeline will not survive a restart"),
    }

    // Build the router
    let app = create_router(Arc::clone(&state), &settings);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   ─── Channels ───");
    info!("   POST /api/channels                 - Create channel");
    info!("   GET  /api/channels                 - List channels");
    info!("   PATCH /api/channels/:id            - Update channel defaults");
    info!("   GET  /api/channels/:id/progress    - Aggregate progress");
    info!("   GET  /api/channels/:id/active-item - Item to keep working on");
    info!("   POST /api/channels/:id/items       - Create item");
    info!("   POST /api/channels/:id/import      - Bulk import items");
    info!("");
    info!("   ─── Stages ───");
    info!("   PUT    /api/items/:id/stages/:stage          - Store stage artifact");
    info!("   DELETE /api/items/:id/stages/:stage          - Reset stage (cascades)");
    info!("   POST   /api/items/:id/stages/:stage/override - Manual override");
    info!("   GET    /api/items/:id/progress               - Progress summary");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(path) = &state.data_file {
        if let Err(e) = persist::save_to(path, &state.pipeline.snapshot()) {
            error!("❌ Pipeline could not be saved on shutdown: {}", e);
            return Err(e.into());
        }
    }

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reelflow=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
