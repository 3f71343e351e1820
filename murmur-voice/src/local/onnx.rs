//! VITS inference through ONNX Runtime.
//!
//! Expects the common VITS export schema:
//! - inputs: `input` [1, T] i64, `input_lengths` [1] i64, `scales` [3] f32,
//!   plus `sid` [1] i64 for multi-speaker models
//! - output: `output` f32 waveform (any leading batch/channel dims)

use super::AcousticModel;
use crate::{Result, SynthesisError};
use std::path::Path;

#[cfg(feature = "onnx")]
use ort::{
    session::{
        builder::{GraphOptimizationLevel, SessionBuilder},
        Session, SessionInputValue, SessionInputs,
    },
    value::{Tensor, Value},
};
#[cfg(feature = "onnx")]
use std::borrow::Cow;
#[cfg(feature = "onnx")]
use std::sync::Mutex;

#[cfg(feature = "onnx")]
const NOISE_SCALE: f32 = 0.667;
#[cfg(feature = "onnx")]
const LENGTH_SCALE: f32 = 1.0;
#[cfg(feature = "onnx")]
const NOISE_SCALE_W: f32 = 0.8;

pub struct OnnxVitsModel {
    #[cfg(feature = "onnx")]
    session: Mutex<Session>,
    multi_speaker: bool,
    scales: [f32; 3],
}

impl OnnxVitsModel {
    #[cfg(feature = "onnx")]
    pub fn load(path: &Path, multi_speaker: bool) -> Result<Self> {
        if !path.exists() {
            return Err(SynthesisError::ModelUnavailable(format!(
                "checkpoint not found: {}",
                path.display()
            )));
        }
        let unavailable = |what: &str, e: &dyn std::fmt::Display| {
            SynthesisError::ModelUnavailable(format!("{what}: {e}"))
        };
        let builder = SessionBuilder::new()
            .map_err(|e| unavailable("failed to create session builder", &e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| unavailable("failed to set optimization level", &e))?;
        let session = builder
            .commit_from_file(path)
            .map_err(|e| unavailable("failed to load model", &e))?;

        tracing::debug!(
            target = "local_tts",
            inputs = ?session.inputs.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
            "ONNX session ready"
        );
        Ok(Self {
            session: Mutex::new(session),
            multi_speaker,
            scales: [NOISE_SCALE, LENGTH_SCALE, NOISE_SCALE_W],
        })
    }

    /// Stub when the `onnx` feature is disabled
    #[cfg(not(feature = "onnx"))]
    pub fn load(_path: &Path, _multi_speaker: bool) -> Result<Self> {
        Err(SynthesisError::ModelUnavailable(
            "built without the `onnx` feature".to_string(),
        ))
    }

    pub fn is_multi_speaker(&self) -> bool {
        self.multi_speaker
    }

    pub fn scales(&self) -> [f32; 3] {
        self.scales
    }
}

#[cfg(feature = "onnx")]
fn tensor_err(e: impl std::fmt::Display) -> SynthesisError {
    SynthesisError::Inference(format!("failed to build tensor: {e}"))
}

impl AcousticModel for OnnxVitsModel {
    #[cfg(feature = "onnx")]
    fn infer(&self, ids: &[i64], speaker_id: i64) -> Result<Vec<f32>> {
        let len = ids.len();
        let input = Tensor::from_array(([1usize, len], ids.to_vec())).map_err(tensor_err)?;
        let lengths = Tensor::from_array(([1usize], vec![len as i64])).map_err(tensor_err)?;
        let scales = Tensor::from_array(([3usize], self.scales.to_vec())).map_err(tensor_err)?;

        let mut inputs: Vec<(Cow<'static, str>, SessionInputValue<'static>)> = vec![
            (
                Cow::Borrowed("input"),
                SessionInputValue::Owned(Value::from(input)),
            ),
            (
                Cow::Borrowed("input_lengths"),
                SessionInputValue::Owned(Value::from(lengths)),
            ),
            (
                Cow::Borrowed("scales"),
                SessionInputValue::Owned(Value::from(scales)),
            ),
        ];
        if self.multi_speaker {
            let sid = Tensor::from_array(([1usize], vec![speaker_id])).map_err(tensor_err)?;
            inputs.push((Cow::Borrowed("sid"), SessionInputValue::Owned(Value::from(sid))));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|e| SynthesisError::Inference(format!("model lock poisoned: {e}")))?;
        let outputs = session
            .run(SessionInputs::from(inputs))
            .map_err(|e| SynthesisError::Inference(e.to_string()))?;
        let audio = outputs
            .get("output")
            .ok_or_else(|| SynthesisError::Inference("model has no `output` tensor".into()))?;
        let (shape, data) = audio
            .try_extract_tensor::<f32>()
            .map_err(|e| SynthesisError::Inference(format!("bad output tensor: {e}")))?;
        tracing::debug!(target = "local_tts", shape = ?shape, samples = data.len(), "Inference complete");
        Ok(data.to_vec())
    }

    #[cfg(not(feature = "onnx"))]
    fn infer(&self, _ids: &[i64], _speaker_id: i64) -> Result<Vec<f32>> {
        Err(SynthesisError::ModelUnavailable(
            "built without the `onnx` feature".to_string(),
        ))
    }
}
