//! Content Pipeline Module
//!
//! Tracks every video of every channel through the seven production
//! stages:
//!
//! 1. **Channel ready**: the item exists and carries its channel defaults
//! 2. **Script**: sections, hook and image prompts
//! 3. **Thumbnails**: generated images
//! 4. **Narration**: synthesized audio
//! 5. **Final render**: encoded video file
//! 6. **Published**: platform URL and metadata
//! 7. **Analytics**: post-publication metrics
//!
//! Stage flags and stored artifacts always move together; clearing a
//! stage clears everything after it.

pub mod activity;
pub mod artifacts;
pub mod coordinator;
pub mod item;
pub mod producer;
pub mod registry;
pub mod stage;
pub mod store;

// Re-export main types for convenient access
pub use activity::{ActivityAction, ActivityEntry, ActivityLog};
pub use artifacts::{Artifact, ArtifactOrigin, ArtifactSet, StagePayload};
pub use coordinator::{ChainMode, PipelineCoordinator};
pub use item::{ContentItem, ContentType, NewItem, ProgressBucket, ProgressSummary, StageOutcome};
pub use producer::ArtifactProducer;
pub use registry::{Channel, ChannelRegistry, ChannelUpdate, NewChannel, ProgressCounts};
pub use stage::{Stage, StageStatus, STAGE_COUNT};
pub use store::ItemStore;
