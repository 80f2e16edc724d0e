use serde::{Deserialize, Serialize};

use qurse_models::{ChatMessage, GenerationRequest, GenerationResult, Geolocation,
    ModelCapabilities, ModelRegistry, ReasoningBundle, SourceRecord, Usage};

/// Inbound chat completion request
#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub web_search_enabled: bool,
    #[serde(default)]
    pub arxiv_mode: bool,
    #[serde(default)]
    pub custom_instructions: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl ChatCompletionRequest {
    pub fn to_generation_request(&self) -> GenerationRequest {
        let geolocation = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Geolocation {
                latitude,
                longitude,
            }),
            _ => None,
        };

        GenerationRequest {
            model: self.model.clone(),
            messages: self.messages.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            tools_enabled: self.web_search_enabled,
            arxiv_mode: self.arxiv_mode,
            custom_instructions: self.custom_instructions.clone(),
            geolocation,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResponseMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ResponseChoice {
    pub index: usize,
    pub message: ResponseMessage,
    pub finish_reason: String,
}

/// Outbound non-streaming chat completion envelope
#[derive(Debug, Serialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ResponseChoice>,
    pub usage: Usage,
    pub sources: Vec<SourceRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningBundle>,
}

impl ChatCompletionResponse {
    pub fn from_result(model: &str, result: GenerationResult) -> Self {
        Self {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4()),
            object: "chat.completion".to_string(),
            created: chrono::Utc::now().timestamp(),
            model: model.to_string(),
            choices: vec![ResponseChoice {
                index: 0,
                message: ResponseMessage {
                    role: "assistant".to_string(),
                    content: result.text,
                },
                finish_reason: "stop".to_string(),
            }],
            usage: result.usage,
            sources: result.sources,
            reasoning: result.reasoning,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModelEntry {
    pub id: String,
    pub display_name: String,
    pub max_tokens: u32,
    pub capabilities: ModelCapabilities,
}

#[derive(Debug, Serialize)]
pub struct ModelGroupEntry {
    pub provider: String,
    pub models: Vec<ModelEntry>,
}

/// Outbound model listing for UI model pickers
#[derive(Debug, Serialize)]
pub struct ModelListResponse {
    pub groups: Vec<ModelGroupEntry>,
}

impl ModelListResponse {
    pub fn from_registry(registry: &ModelRegistry) -> Self {
        let groups = registry
            .enabled_groups()
            .map(|group| ModelGroupEntry {
                provider: group.provider.to_string(),
                models: group
                    .models
                    .iter()
                    .map(|model| ModelEntry {
                        id: model.id.clone(),
                        display_name: model.display_name.clone(),
                        max_tokens: model.max_tokens,
                        capabilities: model.capabilities,
                    })
                    .collect(),
            })
            .collect();
        Self { groups }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_are_off() {
        let payload: ChatCompletionRequest = serde_json::from_str(
            r#"{"model": "Claude 3 Haiku", "messages": [{"role": "user", "content": "hi"}]}"#,
        )
        .unwrap();

        assert!(!payload.stream);
        assert!(!payload.web_search_enabled);
        assert!(!payload.arxiv_mode);

        let request = payload.to_generation_request();
        assert!(!request.tools_enabled);
        assert!(request.geolocation.is_none());
    }

    #[test]
    fn geolocation_requires_both_coordinates() {
        let payload: ChatCompletionRequest = serde_json::from_str(
            r#"{"model": "m", "messages": [], "latitude": 10.0}"#,
        )
        .unwrap();
        assert!(payload.to_generation_request().geolocation.is_none());

        let payload: ChatCompletionRequest = serde_json::from_str(
            r#"{"model": "m", "messages": [], "latitude": 10.0, "longitude": -3.5}"#,
        )
        .unwrap();
        let geo = payload.to_generation_request().geolocation.unwrap();
        assert!((geo.longitude + 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn model_listing_covers_enabled_groups_only() {
        let mut registry = ModelRegistry::builtin();
        registry.set_enabled(qurse_models::Provider::Xai, false);

        let listing = ModelListResponse::from_registry(&registry);
        assert!(listing.groups.iter().all(|g| g.provider != "xai"));
        assert!(listing.groups.iter().any(|g| g.provider == "groq"));
    }
}
