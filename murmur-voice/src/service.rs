//! Backend chaining: remote first, local on failure, nothing after that.

use crate::backend::SynthesisBackend;
use crate::local::LocalBackend;
use crate::remote::{RemoteBackend, RemoteTtsClient, RemoteTtsConfig};
use crate::transcode::{AudioArtifact, Transcoder, TranscoderConfig};
use async_trait::async_trait;
use murmur_core::SpeechSynthesizer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct VoiceService {
    primary: Arc<dyn SynthesisBackend>,
    fallback: Arc<dyn SynthesisBackend>,
}

impl VoiceService {
    pub fn new(primary: Arc<dyn SynthesisBackend>, fallback: Arc<dyn SynthesisBackend>) -> Self {
        Self { primary, fallback }
    }

    /// Remote endpoint as primary, local model as fallback, one shared transcoder.
    pub fn from_config(
        http: reqwest::Client,
        remote: RemoteTtsConfig,
        transcoder: TranscoderConfig,
        model_path: &Path,
        config_path: &Path,
    ) -> Self {
        let transcoder = Arc::new(Transcoder::new(transcoder));
        let client = RemoteTtsClient::with_http(http, remote);
        let primary = Arc::new(RemoteBackend::new(client, transcoder.clone()));
        let fallback = Arc::new(LocalBackend::load(model_path, config_path, transcoder));
        Self::new(primary, fallback)
    }

    pub async fn text_to_speech(&self, text: &str) -> Option<AudioArtifact> {
        let text = text.replace(['\r', '\n'], " ");
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        match self.primary.synthesize(text).await {
            Ok(artifact) => return Some(artifact),
            Err(e) => warn!(
                target = "voice",
                backend = self.primary.name(),
                error = %e,
                "Primary synthesis failed; trying {}",
                self.fallback.name()
            ),
        }

        match self.fallback.synthesize(text).await {
            Ok(artifact) => {
                info!(target = "voice", backend = self.fallback.name(), "Fallback synthesis succeeded");
                Some(artifact)
            }
            Err(e) => {
                error!(target = "voice", backend = self.fallback.name(), error = %e, "All synthesis backends failed");
                None
            }
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for VoiceService {
    async fn synthesize(&self, text: &str) -> Option<PathBuf> {
        self.text_to_speech(text).await.map(AudioArtifact::into_path)
    }
}
