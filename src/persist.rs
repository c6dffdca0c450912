//! Pipeline persistence
//!
//! The whole pipeline is saved as one JSON document. Writes go to a
//! sibling temp file that is renamed over the target, so a crash mid-save
//! never leaves a truncated file behind.

use crate::error::AppError;
use crate::pipeline::item::ContentItem;
use crate::pipeline::registry::Channel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Channel metadata plus the ids of the items it owns
pub type ChannelRecord = Channel;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub channels: Vec<ChannelRecord>,
    pub items: Vec<ContentItem>,
}

impl PipelineSnapshot {
    pub fn new(channels: Vec<ChannelRecord>, items: Vec<ContentItem>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            channels,
            items,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.items.is_empty()
    }
}

/// Write a snapshot to `path` atomically
pub fn save_to(path: &Path, snapshot: &PipelineSnapshot) -> Result<(), AppError> {
    let tmp_path = path.with_extension("json.tmp");
    let result = (|| -> Result<(), AppError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_vec_pretty(snapshot)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(&body)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    })();

    match &result {
        Ok(()) => info!(
            "Saved {} channel(s) and {} item(s) to {}",
            snapshot.channels.len(),
            snapshot.items.len(),
            path.display()
        ),
        Err(e) => {
            let _ = fs::remove_file(&tmp_path);
            error!("Failed to save pipeline to {}: {}", path.display(), e);
        }
    }
    result
}

/// Read a snapshot from `path`. A missing file is an empty pipeline.
pub fn load_from(path: &Path) -> Result<PipelineSnapshot, AppError> {
    if !path.exists() {
        debug!("No pipeline file at {}, starting empty", path.display());
        return Ok(PipelineSnapshot::empty());
    }

    let body = fs::read(path).map_err(|e| {
        error!("Failed to read pipeline file {}: {}", path.display(), e);
        AppError::from(e)
    })?;
    let snapshot: PipelineSnapshot = serde_json::from_slice(&body).map_err(|e| {
        error!("Pipeline file {} is not valid: {}", path.display(), e);
        AppError::from(e)
    })?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(AppError::Persistence(format!(
            "Unsupported pipeline file version {} (expected {})",
            snapshot.version, SNAPSHOT_VERSION
        )));
    }
    Ok(snapshot)
}
