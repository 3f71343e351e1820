#![allow(dead_code)]

use murmur_voice::{Transcoder, TranscoderConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shell script stand-in for an external tool. Callers serialize on it so no
/// other test forks while the script is still open for writing.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// ffmpeg stand-in: writes 4 KiB to its last argument.
pub const FAKE_FFMPEG: &str = r#"for last; do :; done
head -c 4096 /dev/zero > "$last""#;

/// Encoder stand-in: writes 2 KiB to its second argument.
pub const FAKE_ENCODER: &str = r#"head -c 2048 /dev/zero > "$2""#;

/// ffmpeg stand-in that leaves a partial output behind and fails.
pub const FAILING_FFMPEG: &str = r#"for last; do :; done
printf 'partial' > "$last"
echo "nope" >&2
exit 1"#;

pub const HANGING_FFMPEG: &str = "exec sleep 5";

/// Encoder stand-in that returns at once and publishes its output 0.3 s later.
pub const LATE_ENCODER: &str = r#"( sleep 0.3
  head -c 2048 /dev/zero > "$2.part" && mv "$2.part" "$2" ) >/dev/null 2>&1 &
exit 0"#;

pub const TINY_ENCODER: &str = r#"printf 'tiny' > "$2""#;

pub const FAILING_ENCODER: &str = r#"echo "bad input" >&2
exit 3"#;

pub struct FakeTools {
    pub tools: tempfile::TempDir,
    pub work: tempfile::TempDir,
    pub cfg: TranscoderConfig,
}

impl FakeTools {
    #[cfg(unix)]
    pub fn new(encoder_body: &str) -> Self {
        Self::with_scripts(FAKE_FFMPEG, encoder_body)
    }

    #[cfg(unix)]
    pub fn with_scripts(ffmpeg_body: &str, encoder_body: &str) -> Self {
        let tools = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let ffmpeg_bin = write_script(tools.path(), "ffmpeg", ffmpeg_body);
        let encoder_bin = write_script(tools.path(), "silk_v3_encoder", encoder_body);
        let cfg = TranscoderConfig {
            temp_dir: work.path().to_path_buf(),
            ffmpeg_bin,
            encoder_bin,
            target_sample_rate: 24_000,
            process_timeout_ms: 5_000,
            materialize_attempts: 3,
            materialize_interval_ms: 10,
            min_artifact_bytes: 1024,
        };
        Self { tools, work, cfg }
    }

    pub fn transcoder(&self) -> Arc<Transcoder> {
        Arc::new(Transcoder::new(self.cfg.clone()))
    }

    /// File names currently in the work directory, sorted.
    pub fn work_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.work.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}

/// Half a second of a quiet tone.
pub fn tone(sample_rate: u32) -> Vec<f32> {
    (0..sample_rate / 2)
        .map(|i| (i as f32 * 0.03).sin() * 0.3)
        .collect()
}
