use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Unknown text cleaner: {0}")]
    UnknownCleaner(String),

    #[error("Symbol sequence too short to synthesize ({0} symbols)")]
    TooShort(usize),

    #[error("Local model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Remote synthesis error: {0}")]
    Upstream(String),

    #[error("Remote synthesis failed after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("Encoder not found: {}", .0.display())]
    EncoderMissing(PathBuf),

    #[error("{program} exited with code {code:?}: {stderr}")]
    Process {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{program} timed out after {timeout_ms} ms")]
    Timeout { program: String, timeout_ms: u64 },

    #[error("Expected output was not produced: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("Artifact too small ({size} bytes): {}", .path.display())]
    UndersizedArtifact { path: PathBuf, size: u64 },

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SynthesisError>;

impl From<SynthesisError> for murmur_core::MurmurError {
    fn from(e: SynthesisError) -> Self {
        murmur_core::MurmurError::SynthesisError(e.to_string())
    }
}
