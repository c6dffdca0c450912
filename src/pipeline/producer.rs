//! Collaborator seam
//!
//! Script writers, image generators, TTS engines, encoders and uploaders
//! all sit behind [`ArtifactProducer`]. The coordinator awaits the
//! producer without holding any lock and only then writes the result.

use crate::pipeline::stage::Stage;
use async_trait::async_trait;
use serde_json::Value;

/// An external service that turns a request into a stage payload
#[async_trait]
pub trait ArtifactProducer: Send + Sync {
    /// Short, lowercase identifier (e.g. `"tts"`)
    fn name(&self) -> &'static str;

    /// Stages this producer can emit artifacts for
    fn supports(&self, stage: Stage) -> bool;

    /// Produce the payload for `stage`. Errors leave the item untouched.
    async fn produce_artifact(&self, stage: Stage, request: Value) -> anyhow::Result<Value>;
}
