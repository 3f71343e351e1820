use std::fs;
use std::path::{Path, PathBuf};

/// Persona and reply settings for the chat agent.
#[derive(Clone, Debug, PartialEq)]
pub struct PersonaConfig {
    pub name: String,
    pub age: u32,
    pub characteristics: Vec<String>,
    /// Prompt lines; `{name}` and `{age}` are substituted when rendered.
    pub system_prompt: Vec<String>,
    pub max_tokens: u32,
    pub voice_enabled: bool,
    pub vits_model_path: PathBuf,
    pub vits_config_path: PathBuf,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: "小默".to_string(),
            age: 16,
            characteristics: vec![
                "安静的图书管理员".to_string(),
                "喜欢猫和旧书".to_string(),
                "偶尔吐槽".to_string(),
            ],
            system_prompt: vec![
                "你是{name}，今年{age}岁，用简短自然的口语聊天".to_string(),
                "每次回复尽量控制在两句话以内".to_string(),
                "不要使用复杂的书面语".to_string(),
            ],
            max_tokens: 256,
            voice_enabled: true,
            vits_model_path: std::env::var("MURMUR_VITS_MODEL")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models/vits/model.onnx")),
            vits_config_path: std::env::var("MURMUR_VITS_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models/vits/config.json")),
        }
    }
}

impl PersonaConfig {
    /// Load from the JSON file named by `MURMUR_PERSONA` (or ./data/persona.json),
    /// overlaying values onto the built-in defaults.
    pub fn load() -> Self {
        let path = std::env::var("MURMUR_PERSONA").unwrap_or_else(|_| "data/persona.json".into());
        Self::load_from(Path::new(&path))
    }

    /// Never fails: a missing or malformed document falls back to defaults.
    pub fn load_from(path: &Path) -> Self {
        let default = Self::default();
        if !path.exists() {
            tracing::info!(target = "config", path = %path.display(), "No persona config found; using defaults");
            return default;
        }
        match fs::read_to_string(path) {
            Ok(s) => match serde_json::from_str::<PersonaJson>(&s) {
                Ok(j) => j.overlay(default),
                Err(e) => {
                    tracing::warn!(target = "config", error = %e, "Failed to parse persona JSON; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target = "config", error = %e, "Failed to read persona config; using defaults");
                default
            }
        }
    }

    /// System message sent ahead of the conversation history.
    pub fn render_system_prompt(&self) -> String {
        let mut lines: Vec<String> = self
            .system_prompt
            .iter()
            .map(|l| {
                l.replace("{name}", &self.name)
                    .replace("{age}", &self.age.to_string())
            })
            .collect();
        if !self.characteristics.is_empty() {
            lines.push(format!("人设：{}", self.characteristics.join("，")));
        }
        lines.join("\n")
    }
}

// =========================
// JSON overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct PersonaJson {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub characteristics: Option<Vec<String>>,
    pub system_prompt: Option<Vec<String>>,
    pub response_rules: Option<ResponseRulesJson>,
    pub voice_enabled: Option<bool>,
    pub vits_model_path: Option<PathBuf>,
    pub vits_config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ResponseRulesJson {
    pub max_tokens: Option<u32>,
}

impl PersonaJson {
    fn overlay(self, mut base: PersonaConfig) -> PersonaConfig {
        if let Some(x) = self.name {
            base.name = x;
        }
        if let Some(x) = self.age {
            base.age = x;
        }
        if let Some(x) = self.characteristics {
            base.characteristics = x;
        }
        if let Some(x) = self.system_prompt {
            base.system_prompt = x.into_iter().filter(|l| !l.trim().is_empty()).collect();
        }
        if let Some(r) = self.response_rules {
            if let Some(x) = r.max_tokens {
                base.max_tokens = x;
            }
        }
        if let Some(x) = self.voice_enabled {
            base.voice_enabled = x;
        }
        if let Some(x) = self.vits_model_path {
            base.vits_model_path = x;
        }
        if let Some(x) = self.vits_config_path {
            base.vits_config_path = x;
        }
        base
    }
}
