//! LLM module: chat-completions HTTP client behind the `ChatModel` seam
//!
//! This module provides:
//! - `ChatModel`, the narrow interface the chat agent consumes
//! - `LlmClientConfig`, `LlmClient` for talking to OpenAI-compatible backends (DeepSeek by default)

mod client;

pub use client::{ChatModel, LlmClient, LlmClientConfig};
