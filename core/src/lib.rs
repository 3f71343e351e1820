// Murmur Core Library
// Persona chat agent runtime: configuration, LLM client, stores and reply composition

pub mod chat;
pub mod config;
pub mod llm;
pub mod rate_limit;
pub mod speech;
pub mod store;

// Export core types
pub use chat::{ChatAgent, InboundMessage, OutboundMessage, Segment, VoiceCommandOutcome};
pub use config::PersonaConfig;
pub use llm::{ChatModel, LlmClient, LlmClientConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use speech::SpeechSynthesizer;
pub use store::{ChatMessage, HistoryStore, InMemoryStore, StoreConfig, VoiceCache};

use std::sync::Arc;
use std::time::Duration;

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MurmurError {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Synthesis error: {0}")]
    SynthesisError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, MurmurError>;

/// Process-wide resources shared by every request.
///
/// Built once at startup and passed around by `Arc`; nothing in the crate
/// reaches for globals.
pub struct Murmur {
    pub persona: PersonaConfig,
    pub http: reqwest::Client,
    pub store: Arc<InMemoryStore>,
    pub llm: Arc<LlmClient>,
    pub limiter: Arc<RateLimiter>,
    running: bool,
}

impl Murmur {
    pub async fn new(
        persona: PersonaConfig,
        llm_cfg: LlmClientConfig,
        store_cfg: StoreConfig,
        limiter_cfg: RateLimiterConfig,
    ) -> Result<Self> {
        // Per-request timeouts are applied by each client; this one only bounds connects.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MurmurError::ConfigError(format!("Failed to build HTTP client: {e}")))?;
        let llm = Arc::new(LlmClient::with_http(http.clone(), llm_cfg));
        Ok(Self {
            persona,
            http,
            store: InMemoryStore::new(store_cfg),
            llm,
            limiter: Arc::new(RateLimiter::new(limiter_cfg)),
            running: false,
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        tracing::info!("Starting Murmur...");

        self.store.ping().await?;
        tracing::info!(target = "store", "Store connection ok");

        self.running = true;
        tracing::info!("Murmur started successfully");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        if !self.running {
            return Ok(());
        }
        tracing::info!("Shutting down Murmur...");

        self.store.clear();
        self.running = false;

        tracing::info!(target = "store", "Store cleared; Murmur shut down successfully");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}
