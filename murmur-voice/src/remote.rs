//! Remote synthesis through a Gradio-style `/run/predict` endpoint.
//!
//! Request: `{"fn_index": 0, "data": [text, speaker, language, speed]}`.
//! The endpoint writes a WAV on its side and answers with a reference to it in
//! `data[1]`, either `[sample_rate, path]` or `{"name": path, ...}`.
//!
//! Env overrides:
//! - MURMUR_TTS_API_URL, MURMUR_TTS_SPEAKER, MURMUR_TTS_LANGUAGE, MURMUR_TTS_TIMEOUT_MS

use crate::backend::SynthesisBackend;
use crate::transcode::{AudioArtifact, Transcoder};
use crate::waveform::Waveform;
use crate::{Result, SynthesisError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Debug, Clone)]
pub struct RemoteTtsConfig {
    pub api_url: String,
    pub fn_index: u32,
    pub speaker: String,
    pub language: String,
    pub speed: f32,
    pub timeout_ms: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RemoteTtsConfig {
    fn default() -> Self {
        Self {
            api_url: std::env::var("MURMUR_TTS_API_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "http://127.0.0.1:7860/run/predict".to_string()),
            fn_index: 0,
            speaker: std::env::var("MURMUR_TTS_SPEAKER")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "rosmontic".to_string()),
            language: std::env::var("MURMUR_TTS_LANGUAGE")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "简体中文".to_string()),
            speed: 1.0,
            timeout_ms: std::env::var("MURMUR_TTS_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(15_000),
            max_attempts: 3,
            backoff_ms: 1_000,
        }
    }
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    fn_index: u32,
    data: (&'a str, &'a str, &'a str, f32),
}

#[derive(Clone)]
pub struct RemoteTtsClient {
    http: Client,
    cfg: RemoteTtsConfig,
}

impl RemoteTtsClient {
    pub fn new(cfg: RemoteTtsConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()?;
        Ok(Self { http, cfg })
    }

    /// Share an existing connection pool; the request timeout is applied per call.
    pub fn with_http(http: Client, cfg: RemoteTtsConfig) -> Self {
        Self { http, cfg }
    }

    pub fn config(&self) -> &RemoteTtsConfig {
        &self.cfg
    }

    /// Local path of the endpoint's WAV, retrying with a fixed backoff.
    pub async fn fetch_audio_path(&self, text: &str) -> Result<PathBuf> {
        let attempts = self.cfg.max_attempts.max(1);
        for attempt in 1..=attempts {
            match self.request_once(text).await {
                Ok(path) => {
                    debug!(target = "remote_tts", attempt, path = ?path, "Remote audio resolved");
                    return Ok(path);
                }
                Err(e) => {
                    error!(target = "remote_tts", attempt, attempts, error = %e, "Remote synthesis attempt failed");
                    if attempt < attempts {
                        tokio::time::sleep(Duration::from_millis(self.cfg.backoff_ms)).await;
                    }
                }
            }
        }
        Err(SynthesisError::RetriesExhausted { attempts })
    }

    async fn request_once(&self, text: &str) -> Result<PathBuf> {
        let body = PredictRequest {
            fn_index: self.cfg.fn_index,
            data: (
                text,
                self.cfg.speaker.as_str(),
                self.cfg.language.as_str(),
                self.cfg.speed,
            ),
        };
        let resp = self
            .http
            .post(&self.cfg.api_url)
            .timeout(Duration::from_millis(self.cfg.timeout_ms))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let raw = resp.text().await?;
        debug!(target = "remote_tts", %status, body = %truncate(&raw, 500), "Remote response");
        if status != StatusCode::OK {
            return Err(SynthesisError::Upstream(format!("HTTP error: {status}")));
        }

        let envelope: Value = serde_json::from_str(&raw)?;
        let reference = extract_audio_reference(&envelope)?;
        let path = parse_audio_path(&reference).ok_or_else(|| {
            SynthesisError::Upstream(format!("Unresolvable audio path: {reference}"))
        })?;
        if !path.exists() {
            return Err(SynthesisError::Upstream(format!(
                "Audio file does not exist: {}",
                path.display()
            )));
        }
        Ok(path)
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// The raw path string from `data[1]` in either tolerated shape.
pub fn extract_audio_reference(envelope: &Value) -> Result<String> {
    let data = envelope
        .as_object()
        .and_then(|o| o.get("data"))
        .and_then(Value::as_array)
        .ok_or_else(|| SynthesisError::Upstream("Invalid response envelope".into()))?;
    let audio = data
        .get(1)
        .ok_or_else(|| SynthesisError::Upstream("Audio entry missing".into()))?;

    let reference = match audio {
        // [sample_rate, path]
        Value::Array(pair) => pair.get(1).and_then(Value::as_str),
        // {"name": path, ...}
        Value::Object(obj) => obj.get("name").and_then(Value::as_str),
        _ => return Err(SynthesisError::Upstream("Unknown audio entry shape".into())),
    };
    reference
        .map(str::to_string)
        .ok_or_else(|| SynthesisError::Upstream("Audio path field missing".into()))
}

/// Resolve an endpoint file reference into a local path.
///
/// `…file=<percent-encoded path>&…` yields the decoded path (quotes stripped)
/// without checking it; a plain reference is decoded, `\` normalised to `/`,
/// and only returned if it exists.
pub fn parse_audio_path(raw: &str) -> Option<PathBuf> {
    if let Some(idx) = raw.find("file=") {
        let fragment = raw[idx + "file=".len()..].split('&').next().unwrap_or_default();
        let decoded = urlencoding::decode(fragment).ok()?;
        let cleaned = decoded.trim_matches('"');
        if cleaned.is_empty() {
            return None;
        }
        return Some(PathBuf::from(cleaned));
    }

    let decoded = urlencoding::decode(raw).ok()?.replace('\\', "/");
    let path = PathBuf::from(decoded);
    if !raw.is_empty() && path.exists() {
        Some(path)
    } else {
        None
    }
}

/// Remote endpoint + local transcoding.
pub struct RemoteBackend {
    client: RemoteTtsClient,
    transcoder: Arc<Transcoder>,
}

impl RemoteBackend {
    pub fn new(client: RemoteTtsClient, transcoder: Arc<Transcoder>) -> Self {
        Self { client, transcoder }
    }
}

#[async_trait]
impl SynthesisBackend for RemoteBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn synthesize(&self, text: &str) -> Result<AudioArtifact> {
        let path = self.client.fetch_audio_path(text).await?;
        info!(target = "remote_tts", path = ?path, "Remote WAV received; transcoding");
        let wave = tokio::task::spawn_blocking(move || Waveform::read_wav(&path))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;
        self.transcoder.encode(wave).await
    }
}
