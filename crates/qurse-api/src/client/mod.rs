use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use qurse_models::{ChatMessage, Usage};

pub mod anthropic;
pub mod openai_compat;
pub mod thinking;

/// Per-call generation options
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Transient-status retry budget (429 and 5xx)
    pub max_retries: u32,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            max_tokens: None,
            temperature: None,
            max_retries: 3,
        }
    }
}

/// Streaming chunk for LLM responses
#[derive(Debug, Clone, Default)]
pub struct StreamingChunk {
    /// Content token delta
    pub delta: String,
    /// Reasoning token delta, populated for reasoning models
    pub reasoning_delta: Option<String>,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

impl StreamingChunk {
    pub fn is_empty(&self) -> bool {
        self.delta.is_empty()
            && self.reasoning_delta.is_none()
            && self.finish_reason.is_none()
            && self.usage.is_none()
    }
}

pub type ChunkStream = Box<dyn Stream<Item = Result<StreamingChunk>> + Send + Unpin>;

/// LLM response structure
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub message: ChatMessage,
    pub usage: Option<Usage>,
    /// Raw provider response body, kept for downstream reasoning parsing
    pub raw: Option<Value>,
}

/// Tool definition for function calling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    /// OpenAI-compatible wire representation
    pub fn to_openai(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }

    /// Anthropic wire representation
    pub fn to_anthropic(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.parameters,
        })
    }
}

/// LLM client trait - unified interface for all LLM providers
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Chat with tools support (non-streaming)
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDefinition>,
        opts: &CallOptions,
    ) -> Result<LlmResponse>;

    /// Streaming chat completion - returns a stream of chunks
    async fn chat_streaming(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDefinition>,
        opts: &CallOptions,
    ) -> Result<ChunkStream>;
}
