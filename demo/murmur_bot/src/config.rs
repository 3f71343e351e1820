use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use murmur_core::{LlmClientConfig, RateLimiterConfig, StoreConfig};
use murmur_voice::{RemoteTtsConfig, TranscoderConfig};

/// Everything the bot needs besides the persona
#[derive(Clone, Debug)]
pub struct BotConfig {
    /// Persona JSON; falls back to MURMUR_PERSONA or data/persona.json
    pub persona_path: Option<PathBuf>,
    pub llm: LlmClientConfig,
    pub remote_tts: RemoteTtsConfig,
    pub transcoder: TranscoderConfig,
    pub rate_limit: RateLimiterConfig,
    pub store: StoreConfig,
    /// Console user id; the console user is always a superuser
    pub console_user: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        // Every section already honours its env vars
        Self {
            persona_path: std::env::var("MURMUR_PERSONA").ok().map(PathBuf::from),
            llm: LlmClientConfig::default(),
            remote_tts: RemoteTtsConfig::default(),
            transcoder: TranscoderConfig::default(),
            rate_limit: RateLimiterConfig::default(),
            store: StoreConfig::default(),
            console_user: std::env::var("MURMUR_CONSOLE_USER").unwrap_or_else(|_| "console".into()),
        }
    }
}

impl BotConfig {
    /// Defaults + env, then the persona document's `service` block, then the bot
    /// config file (MURMUR_BOT_CONFIG or ./murmur_bot.json). Later layers win.
    pub fn load() -> Self {
        let path = std::env::var("MURMUR_BOT_CONFIG").unwrap_or_else(|_| "murmur_bot.json".into());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(bot_path: &Path) -> Self {
        let bot = read_json::<BotJson>(bot_path, "bot config");
        let mut cfg = Self::default();
        if let Some(p) = bot.as_ref().and_then(|b| b.persona_path.clone()) {
            cfg.persona_path = Some(p);
        }

        let persona_path = cfg
            .persona_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("data/persona.json"));
        if let Some(service) = read_json::<PersonaDocJson>(&persona_path, "persona document")
            .and_then(|doc| doc.service)
        {
            cfg = service.overlay(cfg);
        }

        match bot {
            Some(b) => b.overlay(cfg),
            None => cfg,
        }
    }
}

/// Missing file → info + `None`; unreadable or malformed → warn + `None`.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Option<T> {
    if !path.exists() {
        tracing::info!(target = "murmur_bot", path = %path.display(), "No {} found; using defaults/env", what);
        return None;
    }
    match fs::read_to_string(path) {
        Ok(s) => match serde_json::from_str::<T>(&s) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(target = "murmur_bot", path = %path.display(), error = %e, "Failed to parse {}; using defaults", what);
                None
            }
        },
        Err(e) => {
            tracing::warn!(target = "murmur_bot", path = %path.display(), error = %e, "Failed to read {}; using defaults", what);
            None
        }
    }
}

// JSON overlay definitions

/// The persona document; only its optional `service` block matters here.
#[derive(Debug, Clone, Default, serde::Deserialize)]
struct PersonaDocJson {
    pub service: Option<BotJson>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct BotJson {
    pub persona_path: Option<PathBuf>,
    pub console_user: Option<String>,
    pub llm: Option<LlmJson>,
    pub voice: Option<VoiceJson>,
    pub rate_limit: Option<RateLimitJson>,
    pub history: Option<HistoryJson>,
}

impl BotJson {
    fn overlay(self, mut base: BotConfig) -> BotConfig {
        if let Some(p) = self.persona_path {
            base.persona_path = Some(p);
        }
        if let Some(u) = self.console_user {
            base.console_user = u;
        }
        if let Some(l) = self.llm {
            l.apply(&mut base.llm);
        }
        if let Some(v) = self.voice {
            v.apply(&mut base.remote_tts, &mut base.transcoder);
        }
        if let Some(r) = self.rate_limit {
            r.apply(&mut base.rate_limit);
        }
        if let Some(h) = self.history {
            h.apply(&mut base.store);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct LlmJson {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub temperature: Option<f32>,
}

impl LlmJson {
    fn apply(self, cfg: &mut LlmClientConfig) {
        if let Some(v) = self.base_url {
            cfg.base_url = v;
        }
        if let Some(v) = self.model {
            cfg.model = v;
        }
        if let Some(v) = self.api_key {
            cfg.api_key = Some(v).filter(|k| !k.is_empty());
        }
        if let Some(v) = self.request_timeout_ms {
            cfg.request_timeout_ms = v;
        }
        if let Some(v) = self.temperature {
            cfg.temperature = v;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct VoiceJson {
    pub api_url: Option<String>,
    pub speaker: Option<String>,
    pub language: Option<String>,
    pub speed: Option<f32>,
    pub timeout_ms: Option<u64>,
    pub temp_dir: Option<PathBuf>,
    pub ffmpeg_bin: Option<PathBuf>,
    pub encoder_bin: Option<PathBuf>,
}

impl VoiceJson {
    fn apply(self, remote: &mut RemoteTtsConfig, tc: &mut TranscoderConfig) {
        if let Some(v) = self.api_url {
            remote.api_url = v;
        }
        if let Some(v) = self.speaker {
            remote.speaker = v;
        }
        if let Some(v) = self.language {
            remote.language = v;
        }
        if let Some(v) = self.speed {
            remote.speed = v;
        }
        if let Some(v) = self.timeout_ms {
            remote.timeout_ms = v;
        }
        if let Some(v) = self.temp_dir {
            tc.temp_dir = v;
        }
        if let Some(v) = self.ffmpeg_bin {
            tc.ffmpeg_bin = v;
        }
        if let Some(v) = self.encoder_bin {
            tc.encoder_bin = v;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct RateLimitJson {
    pub max_requests: Option<u32>,
    pub window_secs: Option<u64>,
}

impl RateLimitJson {
    fn apply(self, cfg: &mut RateLimiterConfig) {
        if let Some(v) = self.max_requests {
            cfg.max_requests = v;
        }
        if let Some(v) = self.window_secs {
            cfg.window = Duration::from_secs(v);
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct HistoryJson {
    pub size: Option<usize>,
    pub ttl_secs: Option<u64>,
}

impl HistoryJson {
    fn apply(self, cfg: &mut StoreConfig) {
        if let Some(v) = self.size {
            cfg.history_size = v;
        }
        if let Some(v) = self.ttl_secs {
            cfg.history_ttl = Duration::from_secs(v);
        }
    }
}
