//! Conversation history and voice cache stores.
//!
//! The agent only talks to the `HistoryStore` / `VoiceCache` traits. The
//! in-memory implementation mirrors a key-value layout (`chat:{user}` lists,
//! `voice:{text}` blobs) with per-key TTLs, so a networked store can be
//! dropped in behind the same traits.

use crate::{MurmurError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// One turn of conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a message, keeping only the newest `history_size` entries.
    async fn add_message(&self, user_id: &str, role: &str, content: &str) -> Result<()>;

    /// History in chronological order (oldest first).
    async fn get_history(&self, user_id: &str) -> Result<Vec<ChatMessage>>;

    /// Connectivity check used at startup.
    async fn ping(&self) -> Result<()>;
}

/// Cached synthesized audio keyed by the source text.
///
/// Not consulted by the synthesis pipeline yet.
#[async_trait]
pub trait VoiceCache: Send + Sync {
    async fn cache_voice(&self, text: &str, audio: Vec<u8>) -> Result<()>;
    async fn get_cached_voice(&self, text: &str) -> Result<Option<Vec<u8>>>;
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub history_size: usize,
    pub history_ttl: Duration,
    pub voice_cache_ttl: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_size: 5,
            history_ttl: Duration::from_secs(24 * 3600),
            voice_cache_ttl: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Clone)]
enum StoredValue {
    /// Newest first, like a left-pushed list.
    List(VecDeque<String>),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: StoredValue,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory implementation of both store traits.
///
/// Uses DashMap for concurrent access; expired keys are dropped lazily on read.
pub struct InMemoryStore {
    cfg: StoreConfig,
    entries: DashMap<String, Entry>,
}

impl InMemoryStore {
    pub fn new(cfg: StoreConfig) -> Arc<Self> {
        Arc::new(Self {
            cfg,
            entries: DashMap::new(),
        })
    }

    fn history_key(user_id: &str) -> String {
        format!("chat:{user_id}")
    }

    fn voice_key(text: &str) -> String {
        format!("voice:{text}")
    }

    /// Live (non-expired) value for a key, evicting it when stale.
    fn live(&self, key: &str) -> Option<StoredValue> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(e) if !e.is_expired(now) => return Some(e.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            trace!(target = "store", key, "Evicting expired key");
            self.entries.remove(key);
        }
        None
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    async fn add_message(&self, user_id: &str, role: &str, content: &str) -> Result<()> {
        let key = Self::history_key(user_id);
        let message = serde_json::to_string(&ChatMessage {
            role: role.to_string(),
            content: content.to_string(),
        })?;
        let now = Instant::now();
        let mut entry = self.entries.entry(key).or_insert_with(|| Entry {
            value: StoredValue::List(VecDeque::new()),
            expires_at: now + self.cfg.history_ttl,
        });
        if entry.is_expired(now) || !matches!(entry.value, StoredValue::List(_)) {
            entry.value = StoredValue::List(VecDeque::new());
        }
        if let StoredValue::List(list) = &mut entry.value {
            list.push_front(message);
            list.truncate(self.cfg.history_size);
        }
        entry.expires_at = now + self.cfg.history_ttl;
        debug!(target = "store", user_id, role, "History message appended");
        Ok(())
    }

    async fn get_history(&self, user_id: &str) -> Result<Vec<ChatMessage>> {
        let key = Self::history_key(user_id);
        match self.live(&key) {
            Some(StoredValue::List(list)) => list
                .iter()
                .rev()
                .map(|raw| serde_json::from_str::<ChatMessage>(raw).map_err(MurmurError::from))
                .collect(),
            Some(StoredValue::Bytes(_)) => Err(MurmurError::StoreError(format!(
                "Key {key} does not hold a history list"
            ))),
            None => Ok(Vec::new()),
        }
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl VoiceCache for InMemoryStore {
    async fn cache_voice(&self, text: &str, audio: Vec<u8>) -> Result<()> {
        self.entries.insert(
            Self::voice_key(text),
            Entry {
                value: StoredValue::Bytes(audio),
                expires_at: Instant::now() + self.cfg.voice_cache_ttl,
            },
        );
        Ok(())
    }

    async fn get_cached_voice(&self, text: &str) -> Result<Option<Vec<u8>>> {
        match self.live(&Self::voice_key(text)) {
            Some(StoredValue::Bytes(b)) => Ok(Some(b)),
            _ => Ok(None),
        }
    }
}
