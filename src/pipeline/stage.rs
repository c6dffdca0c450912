//! Stage Policy
//!
//! The fixed, ordered list of production stages and the pure functions
//! that derive "where is this item" from its completion flags.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Number of stages in the pipeline
pub const STAGE_COUNT: usize = 7;

/// Label returned for an index with no matching stage
pub const NOT_STARTED_LABEL: &str = "Not started";

static ORDER: [Stage; STAGE_COUNT] = Stage::ALL;

/// A production stage, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ChannelReady,
    Script,
    Thumbnail,
    Narration,
    Render,
    Publish,
    Analytics,
}

impl Stage {
    /// All stages in pipeline order
    pub const ALL: [Stage; STAGE_COUNT] = [
        Stage::ChannelReady,
        Stage::Script,
        Stage::Thumbnail,
        Stage::Narration,
        Stage::Render,
        Stage::Publish,
        Stage::Analytics,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Stage> {
        Self::ALL.get(index).copied()
    }

    /// Wire key, as used in URLs and persisted records
    pub fn key(self) -> &'static str {
        match self {
            Stage::ChannelReady => "channel_ready",
            Stage::Script => "script",
            Stage::Thumbnail => "thumbnail",
            Stage::Narration => "narration",
            Stage::Render => "render",
            Stage::Publish => "publish",
            Stage::Analytics => "analytics",
        }
    }

    /// Parse a stage key. Dashes are accepted in place of underscores.
    pub fn from_key(key: &str) -> Result<Stage, AppError> {
        let normalized = key.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.key() == normalized)
            .ok_or_else(|| AppError::NotFound(format!("Unknown stage '{}'", key)))
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::ChannelReady => "Channel ready",
            Stage::Script => "Script",
            Stage::Thumbnail => "Thumbnails",
            Stage::Narration => "Narration",
            Stage::Render => "Final render",
            Stage::Publish => "Published",
            Stage::Analytics => "Analytics",
        }
    }

    /// Stages strictly before this one
    pub fn prerequisites(self) -> &'static [Stage] {
        &ORDER[..self.index()]
    }

    /// Stages strictly after this one
    pub fn downstream(self) -> &'static [Stage] {
        &ORDER[self.index() + 1..]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Per-stage completion flags, indexed by [`Stage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageStatus([bool; STAGE_COUNT]);

impl StageStatus {
    /// Status of a freshly created item: only `channel_ready` is done
    pub fn initial() -> Self {
        let mut status = Self::default();
        status.set(Stage::ChannelReady, true);
        status
    }

    /// Build from a loosely keyed map. Unknown keys are ignored and
    /// missing keys count as not done.
    pub fn from_map(map: &HashMap<String, bool>) -> Self {
        let mut status = Self::default();
        for (key, done) in map {
            if let Ok(stage) = Stage::from_key(key) {
                status.set(stage, *done);
            }
        }
        status
    }

    pub fn is_done(&self, stage: Stage) -> bool {
        self.0[stage.index()]
    }

    pub fn set(&mut self, stage: Stage, done: bool) {
        self.0[stage.index()] = done;
    }

    pub fn as_array(&self) -> &[bool; STAGE_COUNT] {
        &self.0
    }

    pub fn to_map(&self) -> HashMap<String, bool> {
        Stage::ALL
            .iter()
            .map(|s| (s.key().to_string(), self.is_done(*s)))
            .collect()
    }
}

impl From<[bool; STAGE_COUNT]> for StageStatus {
    fn from(flags: [bool; STAGE_COUNT]) -> Self {
        Self(flags)
    }
}

/// Index of the highest done stage, or `None` when nothing is done.
///
/// Earlier stages may be undone; the scan does not require contiguity.
pub fn current_stage_index(status: &StageStatus) -> Option<usize> {
    let mut current = None;
    for (index, done) in status.as_array().iter().enumerate() {
        if *done {
            current = Some(index);
        }
    }
    current
}

pub fn is_complete(status: &StageStatus) -> bool {
    status.as_array().iter().all(|done| *done)
}

/// First undone stage after the contiguous done prefix
pub fn next_actionable(status: &StageStatus) -> Option<Stage> {
    Stage::ALL.iter().copied().find(|s| !status.is_done(*s))
}

/// Human label for a stage index
pub fn label_for(index: Option<usize>) -> &'static str {
    index
        .and_then(Stage::from_index)
        .map(Stage::label)
        .unwrap_or(NOT_STARTED_LABEL)
}

/// First undone stage that has a done stage after it
pub fn first_gap(status: &StageStatus) -> Option<Stage> {
    let current = current_stage_index(status)?;
    Stage::ALL[..current]
        .iter()
        .copied()
        .find(|s| !status.is_done(*s))
}

/// True when the done stages form a prefix of the pipeline
pub fn is_contiguous(status: &StageStatus) -> bool {
    first_gap(status).is_none()
}

/// Prerequisites of `stage` that are not yet done
pub fn missing_prerequisites(status: &StageStatus, stage: Stage) -> Vec<Stage> {
    stage
        .prerequisites()
        .iter()
        .copied()
        .filter(|s| !status.is_done(*s))
        .collect()
}
