//! Waveform → SILK transcoding through external tools.
//!
//! Pipeline per request, all files under `temp_dir` with one unique stem:
//! 1. `{stem}.wav`  16-bit PCM WAV at the waveform's own rate
//! 2. `{stem}.pcm`  `ffmpeg -ar 24000 -ac 1 -f s16le`
//! 3. `{stem}.silk` `silk_v3_encoder … -Fs_API 24000 -rate 24000 -tencent -quiet`
//!
//! Every intermediate file is owned by a `TempFiles` guard and removed on all
//! exit paths; only a validated `.silk` leaves the guard.
//!
//! Env overrides:
//! - MURMUR_TEMP_DIR, FFMPEG_BIN, SILK_ENCODER_BIN, MURMUR_PROCESS_TIMEOUT_MS

use crate::utils::unique_stem;
use crate::waveform::Waveform;
use crate::{Result, SynthesisError};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, error, info, warn};

#[derive(Clone, Debug)]
pub struct TranscoderConfig {
    pub temp_dir: PathBuf,
    pub ffmpeg_bin: PathBuf,
    pub encoder_bin: PathBuf,
    pub target_sample_rate: u32,
    pub process_timeout_ms: u64,
    /// Polls for the encoder output before giving up.
    pub materialize_attempts: u32,
    pub materialize_interval_ms: u64,
    pub min_artifact_bytes: u64,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        let temp_dir = std::env::var("MURMUR_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("murmur"));
        let process_timeout_ms = std::env::var("MURMUR_PROCESS_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(15_000);
        Self {
            temp_dir,
            ffmpeg_bin: resolve_bin("FFMPEG_BIN", "ffmpeg"),
            encoder_bin: resolve_bin("SILK_ENCODER_BIN", "silk_v3_encoder"),
            target_sample_rate: 24_000,
            process_timeout_ms,
            materialize_attempts: 10,
            materialize_interval_ms: 500,
            min_artifact_bytes: 1024,
        }
    }
}

/// Env path if it exists, else the first PATH hit, else the bare name.
fn resolve_bin(env_key: &str, default_bin: &str) -> PathBuf {
    if let Ok(p) = std::env::var(env_key) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return pb;
        }
        warn!(target = "transcode", env = env_key, path = ?pb, "Configured binary does not exist");
    }
    find_in_path(default_bin).unwrap_or_else(|| PathBuf::from(default_bin))
}

fn find_in_path(bin: &str) -> Option<PathBuf> {
    if bin.contains(std::path::MAIN_SEPARATOR) {
        let p = PathBuf::from(bin);
        return if p.exists() { Some(p) } else { None };
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(bin))
        .find(|candidate| candidate.exists())
}

/// A finished voice file. The caller owns it and is responsible for deleting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    path: PathBuf,
    size: u64,
}

impl AudioArtifact {
    /// Wrap an existing file, reading its size from disk.
    pub fn from_file(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let size = std::fs::metadata(&path)?.len();
        Ok(Self { path, size })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }

    pub fn file_url(&self) -> String {
        murmur_core::chat::file_url(&self.path)
    }

    pub fn remove(self) -> std::io::Result<()> {
        std::fs::remove_file(&self.path)
    }
}

/// Scoped ownership of temporary files; everything still tracked is deleted on drop.
#[derive(Debug, Default)]
pub(crate) struct TempFiles {
    paths: Vec<PathBuf>,
}

impl TempFiles {
    pub(crate) fn track(&mut self, path: PathBuf) -> PathBuf {
        self.paths.push(path.clone());
        path
    }

    /// Stop tracking `path`; it survives the guard.
    pub(crate) fn release(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(target = "transcode", path = ?path, "Removed temp file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(target = "transcode", path = ?path, error = %e, "Failed to remove temp file"),
            }
        }
    }
}

pub struct Transcoder {
    cfg: TranscoderConfig,
}

impl Transcoder {
    pub fn new(cfg: TranscoderConfig) -> Self {
        info!(target = "transcode", ffmpeg = ?cfg.ffmpeg_bin, encoder = ?cfg.encoder_bin, temp_dir = ?cfg.temp_dir, "Transcoder configured");
        Self { cfg }
    }

    pub fn config(&self) -> &TranscoderConfig {
        &self.cfg
    }

    /// Encode a waveform into a validated SILK file. Not retried.
    pub async fn encode(&self, wave: Waveform) -> Result<AudioArtifact> {
        let stem = unique_stem("temp");
        match self.encode_inner(&stem, wave).await {
            Ok(artifact) => {
                info!(target = "transcode", path = ?artifact.path(), size = artifact.size(), "SILK artifact ready");
                Ok(artifact)
            }
            Err(e) => {
                error!(target = "transcode", stem = %stem, temp_dir = ?self.cfg.temp_dir, error = %e, "Transcoding failed");
                Err(e)
            }
        }
    }

    async fn encode_inner(&self, stem: &str, wave: Waveform) -> Result<AudioArtifact> {
        let cfg = &self.cfg;
        tokio::fs::create_dir_all(&cfg.temp_dir).await?;
        if !cfg.encoder_bin.exists() {
            return Err(SynthesisError::EncoderMissing(cfg.encoder_bin.clone()));
        }

        let mut temps = TempFiles::default();
        let wav = temps.track(cfg.temp_dir.join(format!("{stem}.wav")));
        let pcm = temps.track(cfg.temp_dir.join(format!("{stem}.pcm")));
        let silk = temps.track(cfg.temp_dir.join(format!("{stem}.silk")));

        debug!(target = "transcode", path = ?wav, samples = wave.samples.len(), sample_rate = wave.sample_rate, "Writing WAV");
        let wav_for_write = wav.clone();
        tokio::task::spawn_blocking(move || wave.write_wav_pcm16(&wav_for_write))
            .await
            .map_err(|e| std::io::Error::new(ErrorKind::Other, e))??;

        let rate = cfg.target_sample_rate.to_string();
        let ffmpeg_args: Vec<OsString> = vec![
            "-y".into(),
            "-i".into(),
            wav.clone().into(),
            "-ar".into(),
            rate.clone().into(),
            "-ac".into(),
            "1".into(),
            "-f".into(),
            "s16le".into(),
            "-loglevel".into(),
            "error".into(),
            pcm.clone().into(),
        ];
        run_process(&cfg.ffmpeg_bin, &ffmpeg_args, cfg.process_timeout_ms).await?;
        if !pcm.exists() {
            return Err(SynthesisError::MissingArtifact(pcm));
        }

        let encoder_args: Vec<OsString> = vec![
            pcm.clone().into(),
            silk.clone().into(),
            "-Fs_API".into(),
            rate.clone().into(),
            "-rate".into(),
            rate.into(),
            "-tencent".into(),
            "-quiet".into(),
        ];
        run_process(&cfg.encoder_bin, &encoder_args, cfg.process_timeout_ms).await?;

        wait_for_file(
            &silk,
            cfg.materialize_attempts,
            Duration::from_millis(cfg.materialize_interval_ms),
        )
        .await?;
        let size = tokio::fs::metadata(&silk).await?.len();
        if size < cfg.min_artifact_bytes {
            return Err(SynthesisError::UndersizedArtifact { path: silk, size });
        }

        temps.release(&silk);
        Ok(AudioArtifact { path: silk, size })
    }
}

/// Run a filter-style tool; non-zero exit and timeout are failures.
async fn run_process(program: &Path, args: &[OsString], timeout_ms: u64) -> Result<()> {
    let name = program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.display().to_string());

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!(target = "transcode", command = ?cmd, "Running {}", name);

    let child = cmd.spawn().map_err(|e| SynthesisError::Process {
        program: name.clone(),
        code: None,
        stderr: format!("failed to spawn: {e}"),
    })?;

    match timeout(Duration::from_millis(timeout_ms), child.wait_with_output()).await {
        Err(_) => Err(SynthesisError::Timeout {
            program: name,
            timeout_ms,
        }),
        Ok(Err(e)) => Err(SynthesisError::Io(e)),
        Ok(Ok(output)) if !output.status.success() => Err(SynthesisError::Process {
            program: name,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
        Ok(Ok(_)) => Ok(()),
    }
}

/// Wait for a file to show up (encoders may return before the write is visible).
async fn wait_for_file(path: &Path, attempts: u32, interval: Duration) -> Result<()> {
    let mut attempt = 0;
    while !path.exists() && attempt < attempts {
        debug!(target = "transcode", path = ?path, attempt, "Waiting for encoder output");
        sleep(interval).await;
        attempt += 1;
    }
    if path.exists() {
        Ok(())
    } else {
        Err(SynthesisError::MissingArtifact(path.to_path_buf()))
    }
}
