mod common;

use async_trait::async_trait;
use murmur_core::SpeechSynthesizer;
use murmur_voice::{AudioArtifact, Result, SynthesisBackend, SynthesisError, VoiceService};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// Backend that either hands out a prepared file or fails, counting calls
struct ScriptedBackend {
    name: &'static str,
    output: Option<PathBuf>,
    calls: AtomicUsize,
    texts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn ok(name: &'static str, path: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            name,
            output: Some(path),
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        })
    }

    fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            output: None,
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SynthesisBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn synthesize(&self, text: &str) -> Result<AudioArtifact> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(text.to_string());
        match &self.output {
            Some(path) => Ok(AudioArtifact::from_file(path.clone())?),
            None => Err(SynthesisError::RetriesExhausted { attempts: 3 }),
        }
    }
}

fn silk_file(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, vec![0u8; 2048]).unwrap();
    path
}

#[tokio::test]
async fn primary_success_skips_the_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let remote = ScriptedBackend::ok("remote", silk_file(&dir, "remote.silk"));
    let local = ScriptedBackend::ok("local", silk_file(&dir, "local.silk"));
    let service = VoiceService::new(remote.clone(), local.clone());

    let artifact = service.text_to_speech("你好呀").await.unwrap();
    assert_eq!(artifact.path(), dir.path().join("remote.silk"));
    assert_eq!(remote.calls(), 1);
    assert_eq!(local.calls(), 0);
}

#[tokio::test]
async fn fallback_runs_exactly_once_after_primary_fails() {
    let dir = tempfile::tempdir().unwrap();
    let remote = ScriptedBackend::failing("remote");
    let local = ScriptedBackend::ok("local", silk_file(&dir, "local.silk"));
    let service = VoiceService::new(remote.clone(), local.clone());

    let artifact = service.text_to_speech("你好呀").await.unwrap();
    assert_eq!(artifact.path(), dir.path().join("local.silk"));
    assert_eq!(artifact.size(), 2048);
    assert_eq!(remote.calls(), 1);
    assert_eq!(local.calls(), 1);
}

#[tokio::test]
async fn both_failing_yields_none() {
    let remote = ScriptedBackend::failing("remote");
    let local = ScriptedBackend::failing("local");
    let service = VoiceService::new(remote.clone(), local.clone());

    assert!(service.text_to_speech("你好呀").await.is_none());
    assert_eq!(remote.calls(), 1);
    assert_eq!(local.calls(), 1);
}

#[tokio::test]
async fn blank_text_is_not_synthesized() {
    let remote = ScriptedBackend::failing("remote");
    let local = ScriptedBackend::failing("local");
    let service = VoiceService::new(remote.clone(), local.clone());

    assert!(service.text_to_speech(" \n\r\n ").await.is_none());
    assert_eq!(remote.calls() + local.calls(), 0);
}

#[tokio::test]
async fn newlines_are_flattened_before_synthesis() {
    let dir = tempfile::tempdir().unwrap();
    let remote = ScriptedBackend::ok("remote", silk_file(&dir, "remote.silk"));
    let service = VoiceService::new(remote.clone(), ScriptedBackend::failing("local"));

    service.text_to_speech("\n第一行\n第二行\n").await.unwrap();
    assert_eq!(remote.texts.lock().unwrap().as_slice(), ["第一行 第二行"]);
}

#[tokio::test]
async fn speech_synthesizer_hands_back_the_file_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = silk_file(&dir, "remote.silk");
    let service: Arc<dyn SpeechSynthesizer> = Arc::new(VoiceService::new(
        ScriptedBackend::ok("remote", path.clone()),
        ScriptedBackend::failing("local"),
    ));

    assert_eq!(service.synthesize("你好").await, Some(path));
}

#[tokio::test]
async fn unreachable_endpoint_without_model_yields_none() {
    let dir = tempfile::tempdir().unwrap();
    let remote = murmur_voice::RemoteTtsConfig {
        api_url: "http://127.0.0.1:9/run/predict".into(),
        timeout_ms: 500,
        max_attempts: 2,
        backoff_ms: 1,
        ..Default::default()
    };
    let transcoder = murmur_voice::TranscoderConfig {
        temp_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let service = VoiceService::from_config(
        reqwest::Client::new(),
        remote,
        transcoder,
        &dir.path().join("model.onnx"),
        &dir.path().join("config.json"),
    );

    assert!(service.text_to_speech("你好").await.is_none());
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[cfg(unix)]
mod remote_then_local {
    use super::*;
    use common::{FakeTools, FAKE_ENCODER};
    use murmur_voice::{
        AcousticModel, LocalBackend, RemoteBackend, RemoteTtsClient, RemoteTtsConfig, VitsHParams,
    };
    use serial_test::serial;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct ToneModel {
        calls: AtomicUsize,
    }

    impl AcousticModel for ToneModel {
        fn infer(&self, _ids: &[i64], _speaker_id: i64) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(common::tone(22_050))
        }
    }

    fn hparams() -> VitsHParams {
        let symbols: Vec<String> = "_,.!? abcdefghijklmnopqrstuvwxyz12345"
            .chars()
            .map(String::from)
            .collect();
        VitsHParams::from_json(
            &serde_json::json!({
                "data": {"sampling_rate": 22050, "text_cleaners": ["chinese_cleaners"], "add_blank": true},
                "symbols": symbols
            })
            .to_string(),
        )
        .unwrap()
    }

    #[tokio::test]
    #[serial]
    async fn three_server_errors_fall_back_to_the_local_model() {
        let tools = FakeTools::new(FAKE_ENCODER);
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run/predict"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let remote_cfg = RemoteTtsConfig {
            api_url: format!("{}/run/predict", server.uri()),
            timeout_ms: 2_000,
            backoff_ms: 10,
            ..RemoteTtsConfig::default()
        };
        let remote = RemoteBackend::new(RemoteTtsClient::new(remote_cfg).unwrap(), tools.transcoder());
        let model = Arc::new(ToneModel::default());
        let local = LocalBackend::from_parts(hparams(), model.clone(), tools.transcoder()).unwrap();
        let service = VoiceService::new(Arc::new(remote), Arc::new(local));

        let artifact = service.text_to_speech("你好呀").await.unwrap();
        assert_eq!(artifact.size(), 2048);
        assert!(artifact.path().starts_with(tools.work.path()));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert_eq!(tools.work_files().len(), 1);
    }
}
