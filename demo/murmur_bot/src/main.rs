mod config;
mod console;
use config::BotConfig;
use murmur_core::{
    ChatAgent, ChatModel, HistoryStore, InboundMessage, Murmur, PersonaConfig,
};
use murmur_voice::VoiceService;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        "info,murmur_core=info,murmur_voice=info,murmur_bot=info".to_string()
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(target = "murmur_bot", "Starting Murmur bot: text → LLM → text + voice");

    // Defaults + env + optional JSON overlay
    let cfg = BotConfig::load();
    let persona = match &cfg.persona_path {
        Some(path) => PersonaConfig::load_from(path),
        None => PersonaConfig::load(),
    };
    info!(target = "murmur_bot", persona = %persona.name, voice = persona.voice_enabled, "Persona loaded");

    let mut murmur = Murmur::new(
        persona.clone(),
        cfg.llm.clone(),
        cfg.store.clone(),
        cfg.rate_limit.clone(),
    )
    .await?;
    murmur.start().await?;

    // Remote endpoint first, local VITS as fallback
    let voice = VoiceService::from_config(
        murmur.http.clone(),
        cfg.remote_tts.clone(),
        cfg.transcoder.clone(),
        &persona.vits_model_path,
        &persona.vits_config_path,
    );

    let llm: Arc<dyn ChatModel> = murmur.llm.clone();
    let history: Arc<dyn HistoryStore> = murmur.store.clone();
    let agent = ChatAgent::new(persona, llm, history, Arc::clone(&murmur.limiter))
        .with_voice(Arc::new(voice));

    info!(target = "murmur_bot", user = %cfg.console_user, "Type a message; `/voice on|off` toggles voice replies");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!(target = "murmur_bot", "Shutting down...");
                break;
            }
            line = lines.next_line() => {
                let text = match line {
                    Ok(Some(text)) => text,
                    Ok(None) => {
                        info!(target = "murmur_bot", "stdin closed");
                        break;
                    }
                    Err(e) => {
                        warn!(target = "murmur_bot", error = %e, "Failed to read stdin");
                        break;
                    }
                };
                if text.trim().is_empty() {
                    continue;
                }
                let msg = InboundMessage {
                    user_id: cfg.console_user.clone(),
                    text,
                    is_group: false,
                    is_superuser: true,
                };
                let replies = agent.dispatch(&msg).await;
                let mut stdout = std::io::stdout().lock();
                for out in &replies {
                    if let Err(e) = console::deliver(out, &mut stdout) {
                        warn!(target = "murmur_bot", error = %e, "Failed to write reply");
                    }
                }
            }
        }
    }

    murmur.shutdown().await.ok();
    Ok(())
}
