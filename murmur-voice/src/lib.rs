//! Voice reply pipeline
//!
//! Turns reply text into a SILK voice file:
//! - `remote`: Gradio-style synthesis endpoint (tried first, 3 attempts)
//! - `local`: VITS model exported to ONNX (fallback; needs the `onnx` feature)
//! - `text`: per-language cleaners and symbol lookup for the local model
//! - `transcode`: waveform → WAV → 24 kHz s16le PCM (ffmpeg) → SILK (encoder)
//!
//! `VoiceService` chains the backends and implements
//! `murmur_core::SpeechSynthesizer`.

pub mod backend;
pub mod error;
pub mod local;
pub mod remote;
pub mod service;
pub mod text;
pub mod transcode;
pub mod waveform;

pub(crate) mod utils;

pub use backend::SynthesisBackend;
pub use error::{Result, SynthesisError};
pub use local::{AcousticModel, LocalBackend, VitsHParams};
pub use remote::{RemoteBackend, RemoteTtsClient, RemoteTtsConfig};
pub use service::VoiceService;
pub use transcode::{AudioArtifact, Transcoder, TranscoderConfig};
pub use waveform::Waveform;
