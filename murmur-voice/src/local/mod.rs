//! Local VITS fallback.
//!
//! Loaded once at startup. A missing checkpoint, unreadable config or unknown
//! cleaner leaves the backend disabled; every request then fails fast with
//! `ModelUnavailable` instead of taking the process down.

mod hparams;
pub mod onnx;

pub use hparams::{DataParams, VitsHParams};
pub use onnx::OnnxVitsModel;

use crate::backend::SynthesisBackend;
use crate::text::{cleaner_by_name, intersperse, text_to_sequence, SymbolTable};
use crate::transcode::{AudioArtifact, Transcoder};
use crate::waveform::Waveform;
use crate::{Result, SynthesisError};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Minimum number of symbol ids a cleaned utterance must produce.
pub const MIN_SEQUENCE_LEN: usize = 3;

/// Single-speaker requests always use speaker 0.
const DEFAULT_SPEAKER_ID: i64 = 0;

/// Symbol ids in, mono samples out. Called from a blocking thread.
pub trait AcousticModel: Send + Sync {
    fn infer(&self, ids: &[i64], speaker_id: i64) -> Result<Vec<f32>>;
}

/// Clean and encode `text`, rejecting utterances shorter than
/// `MIN_SEQUENCE_LEN` before blanks are added.
pub fn prepare_sequence<S: AsRef<str>>(
    text: &str,
    symbols: &SymbolTable,
    cleaners: &[S],
    add_blank: bool,
) -> Result<Vec<i64>> {
    let seq = text_to_sequence(text, symbols, cleaners)?;
    if seq.len() < MIN_SEQUENCE_LEN {
        return Err(SynthesisError::TooShort(seq.len()));
    }
    Ok(if add_blank { intersperse(&seq, 0) } else { seq })
}

struct ReadyModel {
    hparams: VitsHParams,
    symbols: SymbolTable,
    model: Arc<dyn AcousticModel>,
}

enum State {
    Ready(ReadyModel),
    Disabled(String),
}

pub struct LocalBackend {
    state: State,
    transcoder: Arc<Transcoder>,
}

impl LocalBackend {
    /// Load hyper-parameters and the ONNX checkpoint. Never fails; problems
    /// are logged and the backend stays disabled.
    pub fn load(model_path: &Path, config_path: &Path, transcoder: Arc<Transcoder>) -> Self {
        match Self::try_load(model_path, config_path, transcoder.clone()) {
            Ok(backend) => {
                info!(target = "local_tts", model = ?model_path, "Local VITS model loaded");
                backend
            }
            Err(e) => {
                error!(target = "local_tts", model = ?model_path, config = ?config_path, error = %e, "Local VITS model unavailable");
                Self::disabled(e.to_string(), transcoder)
            }
        }
    }

    fn try_load(model_path: &Path, config_path: &Path, transcoder: Arc<Transcoder>) -> Result<Self> {
        if !config_path.exists() {
            return Err(SynthesisError::ModelUnavailable(format!(
                "config not found: {}",
                config_path.display()
            )));
        }
        let hparams = VitsHParams::from_file(config_path)?;
        let model = OnnxVitsModel::load(model_path, hparams.is_multi_speaker())?;
        Self::from_parts(hparams, Arc::new(model), transcoder)
    }

    /// Assemble a ready backend from parsed hyper-parameters and any model.
    pub fn from_parts(
        hparams: VitsHParams,
        model: Arc<dyn AcousticModel>,
        transcoder: Arc<Transcoder>,
    ) -> Result<Self> {
        if hparams.symbols.is_empty() {
            return Err(SynthesisError::ModelUnavailable(
                "config has no symbols".to_string(),
            ));
        }
        for name in &hparams.data.text_cleaners {
            cleaner_by_name(name)?;
        }
        let symbols = SymbolTable::new(&hparams.symbols);
        debug!(
            target = "local_tts",
            symbols = symbols.len(),
            cleaners = ?hparams.data.text_cleaners,
            add_blank = hparams.data.add_blank,
            sampling_rate = hparams.data.sampling_rate,
            "Local backend ready"
        );
        Ok(Self {
            state: State::Ready(ReadyModel {
                hparams,
                symbols,
                model,
            }),
            transcoder,
        })
    }

    pub fn disabled(reason: impl Into<String>, transcoder: Arc<Transcoder>) -> Self {
        Self {
            state: State::Disabled(reason.into()),
            transcoder,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }
}

#[async_trait]
impl SynthesisBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn synthesize(&self, text: &str) -> Result<AudioArtifact> {
        let ready = match &self.state {
            State::Ready(ready) => ready,
            State::Disabled(reason) => {
                return Err(SynthesisError::ModelUnavailable(reason.clone()));
            }
        };

        let data = &ready.hparams.data;
        let ids = prepare_sequence(text, &ready.symbols, &data.text_cleaners, data.add_blank)?;
        debug!(target = "local_tts", ids = ids.len(), "Running local inference");

        let model = ready.model.clone();
        let samples = tokio::task::spawn_blocking(move || model.infer(&ids, DEFAULT_SPEAKER_ID))
            .await
            .map_err(|e| SynthesisError::Inference(format!("inference task failed: {e}")))??;
        if samples.is_empty() {
            return Err(SynthesisError::Inference("model produced no audio".to_string()));
        }

        let wave = Waveform::new(samples, data.sampling_rate);
        info!(target = "local_tts", seconds = wave.duration_secs(), "Local waveform ready; transcoding");
        self.transcoder.encode(wave).await
    }
}
