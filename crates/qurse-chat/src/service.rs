use colored::Colorize;

use qurse_api::{resolve_language_model, CallOptions, ChunkStream};
use qurse_models::{BudgetTable, ChatMessage, GenerationRequest, GenerationResult, ModelRegistry,
    ReasoningBundle, Usage};
use qurse_tools::{AggressiveWebSearchTool, ArxivClient, ArxivSearchTool, ExaSearchClient,
    LocationDetectorTool, SearchSession, ToolRegistry, WeatherTool};

use crate::error::GenerationError;
use crate::orchestrator::run_tool_loop;

pub const DEFAULT_ONESHOT_MAX_TOKENS: u32 = 8192;
pub const DEFAULT_STREAM_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Search backend configuration for the tool layer
#[derive(Debug, Clone, Default)]
pub struct SearchConfig {
    pub exa_api_key: Option<String>,
    pub exa_base_url: Option<String>,
    pub arxiv_base_url: Option<String>,
}

impl SearchConfig {
    pub fn from_env() -> Self {
        let read = |var: &str| std::env::var(var).ok().filter(|v| !v.is_empty());
        Self {
            exa_api_key: read("EXA_API_KEY"),
            exa_base_url: read("EXA_BASE_URL"),
            arxiv_base_url: read("ARXIV_BASE_URL"),
        }
    }
}

/// The generation service: one instance per process, one call per request
pub struct ChatService {
    registry: ModelRegistry,
    budgets: BudgetTable,
    search: SearchConfig,
}

impl ChatService {
    pub fn new(registry: ModelRegistry, budgets: BudgetTable, search: SearchConfig) -> Self {
        Self {
            registry,
            budgets,
            search,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            ModelRegistry::builtin(),
            BudgetTable::builtin(),
            SearchConfig::from_env(),
        )
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Routing entry point: the tool path when search is requested and the
    /// model supports tools, plain generation otherwise. A tool-incapable
    /// model with `tools_enabled` falls through silently; that is expected
    /// routing, not an error.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        if request.tools_enabled && self.registry.supports_tools(&request.model) {
            return self.generate_with_tools(request).await;
        }
        self.generate_once(request).await
    }

    /// Single-shot generation with no tools
    pub async fn generate_once(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        let client = resolve_language_model(&self.registry, &request.model)
            .ok_or_else(|| GenerationError::ModelNotAvailable(request.model.clone()))?;

        let opts = CallOptions {
            max_tokens: Some(request.max_tokens.unwrap_or(DEFAULT_ONESHOT_MAX_TOKENS)),
            temperature: Some(request.temperature.unwrap_or(DEFAULT_TEMPERATURE)),
            ..CallOptions::default()
        };

        let messages = self.plain_messages(request);
        let response = client.chat(messages, vec![], &opts).await?;

        // A structured reasoning field (provider or middleware) wins; the
        // post-hoc parser handles everything else, including raw-response
        // shapes and inline tags on unwrapped models
        let (text, combined) = match response.message.reasoning {
            Some(reasoning) => {
                let trimmed = response.message.content.trim();
                let text = if trimmed.is_empty() {
                    qurse_reasoning::EMPTY_ANSWER_FALLBACK.to_string()
                } else {
                    trimmed.to_string()
                };
                (text, Some(reasoning))
            }
            None => {
                let parsed = qurse_reasoning::parse(
                    &response.message.content,
                    Some(&request.model),
                    response.raw.as_ref(),
                );
                (parsed.final_answer, parsed.reasoning)
            }
        };

        let reasoning = combined.map(|combined| ReasoningBundle {
            combined,
            steps: Vec::new(),
        });

        Ok(GenerationResult {
            text,
            usage: response.usage.unwrap_or(Usage::default()),
            reasoning,
            sources: Vec::new(),
        })
    }

    /// Streaming generation with no tools
    pub async fn generate_streaming(
        &self,
        request: &GenerationRequest,
    ) -> Result<ChunkStream, GenerationError> {
        let client = resolve_language_model(&self.registry, &request.model)
            .ok_or_else(|| GenerationError::ModelNotAvailable(request.model.clone()))?;

        let opts = CallOptions {
            max_tokens: Some(request.max_tokens.unwrap_or(DEFAULT_STREAM_MAX_TOKENS)),
            temperature: Some(request.temperature.unwrap_or(DEFAULT_TEMPERATURE)),
            ..CallOptions::default()
        };

        let messages = self.plain_messages(request);
        let stream = client.chat_streaming(messages, vec![], &opts).await?;
        Ok(stream)
    }

    async fn generate_with_tools(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        let model = self
            .registry
            .get_model_info(&request.model)
            .ok_or_else(|| GenerationError::ModelNotAvailable(request.model.clone()))?;
        let client = resolve_language_model(&self.registry, &request.model)
            .ok_or_else(|| GenerationError::ModelNotAvailable(request.model.clone()))?;

        let budget = self.budgets.budget_for(model);
        let tools = build_toolset(&self.search, request.arxiv_mode);
        let session = SearchSession::new();

        match run_tool_loop(&client, &budget, &tools, &session, request).await {
            Ok(result) => Ok(result),
            Err(e) => {
                // Catch once and degrade to plain generation, keeping any
                // sources the failed run already captured
                if qurse_logging::verbose_enabled() {
                    eprintln!(
                        "{}",
                        format!("Tool loop failed, falling back to plain generation: {}", e)
                            .yellow()
                    );
                }
                let mut result = self.generate_once(request).await?;
                if result.sources.is_empty() {
                    result.sources = session.sources();
                }
                Ok(result)
            }
        }
    }

    /// Messages for the plain path: optional custom instructions as a system
    /// prompt, then the caller's conversation untouched
    fn plain_messages(&self, request: &GenerationRequest) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(custom) = &request.custom_instructions {
            if !custom.trim().is_empty() {
                messages.push(ChatMessage::system(custom.trim()));
            }
        }
        messages.extend_from_slice(&request.messages);
        messages
    }
}

/// Exactly one search tool per call, selected by mode, plus the
/// always-available utility tools
pub(crate) fn build_toolset(search: &SearchConfig, arxiv_mode: bool) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    if arxiv_mode {
        registry.register(ArxivSearchTool::new(ArxivClient::new(
            search.arxiv_base_url.clone(),
        )));
    } else {
        registry.register(AggressiveWebSearchTool::new(ExaSearchClient::new(
            search.exa_api_key.clone().unwrap_or_default(),
            search.exa_base_url.clone(),
        )));
    }

    registry.register(WeatherTool::new(None));
    registry.register(LocationDetectorTool::new(None));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_mode_toolset_excludes_arxiv() {
        let registry = build_toolset(&SearchConfig::default(), false);
        assert!(registry.has_tool("aggressive_web_search"));
        assert!(!registry.has_tool("arxiv_search"));
        assert!(registry.has_tool("weather"));
        assert!(registry.has_tool("location_detector"));
    }

    #[test]
    fn arxiv_mode_toolset_excludes_web_search() {
        let registry = build_toolset(&SearchConfig::default(), true);
        assert!(registry.has_tool("arxiv_search"));
        assert!(!registry.has_tool("aggressive_web_search"));
        assert!(registry.has_tool("weather"));
        assert!(registry.has_tool("location_detector"));
    }
}
