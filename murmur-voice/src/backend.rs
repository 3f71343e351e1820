use crate::transcode::AudioArtifact;
use crate::Result;
use async_trait::async_trait;

/// One way of turning text into a finished voice file.
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    /// A static identifier used in logs
    fn name(&self) -> &'static str;

    async fn synthesize(&self, text: &str) -> Result<AudioArtifact>;
}
