//! Reply composition for inbound chat messages.
//!
//! Flow per message: rate limit → history → LLM → (optional) voice. The text
//! reply and the voice record are independent outbound messages; a voice
//! failure only drops the record.

use crate::config::PersonaConfig;
use crate::llm::ChatModel;
use crate::rate_limit::RateLimiter;
use crate::speech::SpeechSynthesizer;
use crate::store::HistoryStore;
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const RATE_LIMITED_REPLY: &str = "请求太频繁啦~ (>ω<)";
pub const DELIVERY_FAILED_REPLY: &str = "消息发送失败了，请联系管理员查看日志……";
pub const VOICE_ON_REPLY: &str = "语音回复已开启~";
pub const VOICE_OFF_REPLY: &str = "语音回复已关闭。";
pub const VOICE_USAGE_REPLY: &str = "用法：/voice on 或 /voice off（也可以用 开启 / 关闭）";

const VOICE_COMMANDS: [&str; 2] = ["/voice", "/语音模式"];

/// Chat event as delivered by the host framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub user_id: String,
    pub text: String,
    pub is_group: bool,
    pub is_superuser: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    /// Voice record referenced by `file:///` URL.
    Record { file: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub segments: Vec<Segment>,
    pub at_sender: bool,
}

impl OutboundMessage {
    fn text(text: impl Into<String>, at_sender: bool) -> Self {
        Self {
            segments: vec![Segment::Text(text.into())],
            at_sender,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommandOutcome {
    Enabled,
    Disabled,
    Usage,
}

pub struct ChatAgent {
    persona: PersonaConfig,
    system_prompt: String,
    voice_enabled: AtomicBool,
    llm: Arc<dyn ChatModel>,
    history: Arc<dyn HistoryStore>,
    limiter: Arc<RateLimiter>,
    voice: Option<Arc<dyn SpeechSynthesizer>>,
}

impl ChatAgent {
    pub fn new(
        persona: PersonaConfig,
        llm: Arc<dyn ChatModel>,
        history: Arc<dyn HistoryStore>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            system_prompt: persona.render_system_prompt(),
            voice_enabled: AtomicBool::new(persona.voice_enabled),
            persona,
            llm,
            history,
            limiter,
            voice: None,
        }
    }

    pub fn with_voice(mut self, voice: Arc<dyn SpeechSynthesizer>) -> Self {
        self.voice = Some(voice);
        self
    }

    pub fn persona(&self) -> &PersonaConfig {
        &self.persona
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice_enabled.load(Ordering::Relaxed)
    }

    /// Entry point: superuser voice commands first, everything else is chat.
    pub async fn dispatch(&self, msg: &InboundMessage) -> Vec<OutboundMessage> {
        if msg.is_superuser {
            if let Some(arg) = parse_voice_command(&msg.text) {
                let (_, reply) = self.handle_voice_command(arg);
                return vec![OutboundMessage::text(reply, false)];
            }
        }
        self.handle_message(msg).await
    }

    pub fn handle_voice_command(&self, arg: &str) -> (VoiceCommandOutcome, &'static str) {
        match arg.trim().to_lowercase().as_str() {
            "on" | "开启" => {
                self.voice_enabled.store(true, Ordering::Relaxed);
                info!(target = "chat", "Voice replies enabled");
                (VoiceCommandOutcome::Enabled, VOICE_ON_REPLY)
            }
            "off" | "关闭" => {
                self.voice_enabled.store(false, Ordering::Relaxed);
                info!(target = "chat", "Voice replies disabled");
                (VoiceCommandOutcome::Disabled, VOICE_OFF_REPLY)
            }
            _ => (VoiceCommandOutcome::Usage, VOICE_USAGE_REPLY),
        }
    }

    /// Never fails: unexpected errors become the generic delivery-failed reply.
    pub async fn handle_message(&self, msg: &InboundMessage) -> Vec<OutboundMessage> {
        let at_sender = !msg.is_group;
        if !self.limiter.check(&msg.user_id) {
            return vec![OutboundMessage::text(RATE_LIMITED_REPLY, at_sender)];
        }
        match self.reply(msg, at_sender).await {
            Ok(out) => out,
            Err(e) => {
                error!(target = "chat", user_id = %msg.user_id, error = %e, "Failed to build reply");
                vec![OutboundMessage::text(DELIVERY_FAILED_REPLY, at_sender)]
            }
        }
    }

    async fn reply(&self, msg: &InboundMessage, at_sender: bool) -> Result<Vec<OutboundMessage>> {
        let prompt = msg.text.trim();
        let history = self.history.get_history(&msg.user_id).await?;
        let response = self
            .llm
            .generate(&self.system_prompt, prompt, &history, self.persona.max_tokens)
            .await?;

        for (role, content) in [("user", prompt), ("assistant", response.as_str())] {
            if let Err(e) = self.history.add_message(&msg.user_id, role, content).await {
                warn!(target = "chat", error = %e, role, "Failed to record history");
            }
        }

        let mut out = Vec::with_capacity(2);
        if response.is_empty() {
            warn!(target = "chat", user_id = %msg.user_id, "LLM returned an empty reply");
            return Ok(out);
        }
        out.push(OutboundMessage::text(response.clone(), at_sender));

        if self.voice_enabled() {
            if let Some(voice) = &self.voice {
                match voice.synthesize(&response).await {
                    Some(path) if path.exists() => out.push(OutboundMessage {
                        segments: vec![Segment::Record {
                            file: file_url(&path),
                        }],
                        at_sender,
                    }),
                    Some(path) => {
                        warn!(target = "chat", path = ?path, "Voice file vanished before sending")
                    }
                    None => warn!(target = "chat", "Voice synthesis failed; sending text only"),
                }
            }
        }
        Ok(out)
    }
}

/// Argument of a voice command, if `text` is one.
pub fn parse_voice_command(text: &str) -> Option<&str> {
    let text = text.trim();
    VOICE_COMMANDS.iter().find_map(|cmd| {
        let rest = text.strip_prefix(cmd)?;
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            Some(rest.trim())
        } else {
            None
        }
    })
}

/// `file:///` URL with forward slashes, as chat platforms expect.
pub fn file_url(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    format!("file:///{}", s.trim_start_matches('/'))
}

/// Local path behind a `file:///` URL produced by [`file_url`].
pub fn path_from_file_url(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix("file:///")?;
    if rest.is_empty() {
        return None;
    }
    // `D:/...` keeps its drive letter; everything else is absolute from `/`
    if rest.chars().nth(1) == Some(':') {
        Some(PathBuf::from(rest))
    } else {
        Some(PathBuf::from(format!("/{rest}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_voice_commands() {
        assert_eq!(parse_voice_command("/voice on"), Some("on"));
        assert_eq!(parse_voice_command("  /语音模式 关闭 "), Some("关闭"));
        assert_eq!(parse_voice_command("/voice"), Some(""));
        assert_eq!(parse_voice_command("/voiceover"), None);
        assert_eq!(parse_voice_command("hello"), None);
    }

    #[test]
    fn file_url_uses_three_slashes() {
        assert_eq!(file_url(Path::new("/tmp/a.silk")), "file:///tmp/a.silk");
        assert_eq!(
            file_url(Path::new(r"D:\data\record\a.silk")),
            "file:///D:/data/record/a.silk"
        );
    }

    #[test]
    fn file_url_maps_back_to_the_path() {
        let p = Path::new("/tmp/murmur/temp_1.silk");
        assert_eq!(path_from_file_url(&file_url(p)), Some(p.to_path_buf()));
        assert_eq!(
            path_from_file_url("file:///D:/data/record/a.silk"),
            Some(PathBuf::from("D:/data/record/a.silk"))
        );
        assert_eq!(path_from_file_url("http://x/a.silk"), None);
        assert_eq!(path_from_file_url("file:///"), None);
    }
}
