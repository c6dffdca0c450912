//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::config::Settings;
use crate::pipeline::PipelineCoordinator;
use std::path::PathBuf;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Channels, items and activity (has internal locking)
    pub pipeline: PipelineCoordinator,

    /// Where the pipeline is saved on shutdown, if anywhere
    pub data_file: Option<PathBuf>,
}

impl AppState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            pipeline: PipelineCoordinator::new(
                settings.pipeline.chain_mode,
                settings.pipeline.activity_capacity,
            ),
            data_file: settings.pipeline.data_file.clone(),
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
