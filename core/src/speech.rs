//! Seam between the chat agent and whatever turns reply text into a voice file.

use async_trait::async_trait;
use std::path::PathBuf;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Path of a finished voice file ready to attach, or `None` when synthesis
    /// failed. Failures are logged by the implementation, never raised.
    async fn synthesize(&self, text: &str) -> Option<PathBuf>;
}
