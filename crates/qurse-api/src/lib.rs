//! # qurse-api
//!
//! A unified interface for interacting with multiple LLM providers:
//! - Groq
//! - OpenAI
//! - Anthropic (Claude)
//! - XAI (Grok)
//!
//! ## Features
//!
//! - **Unified Interface**: Single `LlmClient` trait for all providers
//! - **Format Translation**: Automatic translation between provider-specific formats
//! - **Streaming Support**: Both streaming and non-streaming APIs
//! - **Reasoning Extraction**: Models that emit inline `<think>` tags are
//!   wrapped with a middleware that splits reasoning out of the token stream
//! - **Graceful Degradation**: Resolution without credentials returns `None`
//!   instead of failing the process
//!
//! ## Example
//!
//! ```rust,no_run
//! use qurse_api::{resolve_language_model, CallOptions};
//! use qurse_models::{ChatMessage, ModelRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = ModelRegistry::builtin();
//!     let client = resolve_language_model(&registry, "Claude 3 Haiku")
//!         .ok_or_else(|| anyhow::anyhow!("model not available"))?;
//!
//!     let messages = vec![ChatMessage::user("Hello!")];
//!     let response = client.chat(messages, vec![], &CallOptions::default()).await?;
//!     println!("Response: {}", response.message.content);
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;

// Re-export commonly used types
pub use client::{
    anthropic::AnthropicClient, openai_compat::OpenAiCompatClient, thinking::ThinkTagClient,
    CallOptions, ChunkStream, LlmClient, LlmResponse, StreamingChunk, ToolDefinition,
};
pub use config::{
    factory::{resolve_language_model, ClientFactory},
    Backend, ANTHROPIC_API_URL, GROQ_API_URL, OPENAI_API_URL, XAI_API_URL,
};
