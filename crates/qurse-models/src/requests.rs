use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, Geolocation};

/// Wire request for OpenAI-compatible chat completion endpoints
#[derive(Debug, Serialize, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// One generation call as the service sees it, constructed per HTTP request
/// and consumed once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Display name resolved against the model registry
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub tools_enabled: bool,
    #[serde(default)]
    pub arxiv_mode: bool,
    #[serde(default)]
    pub custom_instructions: Option<String>,
    #[serde(default)]
    pub geolocation: Option<Geolocation>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: None,
            temperature: None,
            tools_enabled: false,
            arxiv_mode: false,
            custom_instructions: None,
            geolocation: None,
        }
    }
}
