use serde::{Deserialize, Serialize};

/// Providers the binding layer knows how to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Groq,
    Xai,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Groq => "groq",
            Provider::Xai => "xai",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability flags attached to each catalog entry
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ModelCapabilities {
    pub reasoning: bool,
    pub tools: bool,
    pub image: bool,
}

/// One model in the catalog, looked up by display name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Provider-native model identifier sent on the wire
    pub id: String,
    pub display_name: String,
    pub provider: Provider,
    /// Advisory output ceiling; per-request limits are set by the caller
    pub max_tokens: u32,
    pub default_temperature: f32,
    pub capabilities: ModelCapabilities,
}

impl ModelInfo {
    fn new(
        id: &str,
        display_name: &str,
        provider: Provider,
        max_tokens: u32,
        capabilities: ModelCapabilities,
    ) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            provider,
            max_tokens,
            default_temperature: 0.7,
            capabilities,
        }
    }
}

/// Models grouped per provider; a disabled group is invisible to lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderGroup {
    pub provider: Provider,
    pub enabled: bool,
    pub models: Vec<ModelInfo>,
}

/// Static model catalog, built once at startup
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    groups: Vec<ProviderGroup>,
}

const fn caps(reasoning: bool, tools: bool, image: bool) -> ModelCapabilities {
    ModelCapabilities {
        reasoning,
        tools,
        image,
    }
}

impl ModelRegistry {
    pub fn from_groups(groups: Vec<ProviderGroup>) -> Self {
        Self { groups }
    }

    /// The builtin catalog with every provider group enabled
    pub fn builtin() -> Self {
        let groups = vec![
            ProviderGroup {
                provider: Provider::OpenAi,
                enabled: true,
                models: vec![
                    ModelInfo::new("gpt-4o", "GPT-4o", Provider::OpenAi, 16384, caps(false, true, true)),
                    ModelInfo::new("gpt-4o-mini", "GPT-4o Mini", Provider::OpenAi, 16384, caps(false, true, true)),
                    ModelInfo::new("o3-mini", "o3 Mini", Provider::OpenAi, 65536, caps(true, true, false)),
                ],
            },
            ProviderGroup {
                provider: Provider::Anthropic,
                enabled: true,
                models: vec![
                    ModelInfo::new("claude-3-haiku-20240307", "Claude 3 Haiku", Provider::Anthropic, 4096, caps(false, true, false)),
                    ModelInfo::new("claude-3-5-sonnet-20241022", "Claude 3.5 Sonnet", Provider::Anthropic, 8192, caps(false, true, true)),
                    ModelInfo::new("claude-3-7-sonnet-20250219", "Claude 3.7 Sonnet", Provider::Anthropic, 64000, caps(true, true, true)),
                ],
            },
            ProviderGroup {
                provider: Provider::Groq,
                enabled: true,
                models: vec![
                    ModelInfo::new("deepseek-r1-distill-llama-70b", "DeepSeek R1 Distill 70B", Provider::Groq, 16384, caps(true, true, false)),
                    ModelInfo::new("qwen-qwq-32b", "QwQ 32B", Provider::Groq, 32768, caps(true, true, false)),
                    ModelInfo::new("openai/gpt-oss-120b", "GPT-OSS 120B", Provider::Groq, 32768, caps(true, true, false)),
                    ModelInfo::new("openai/gpt-oss-20b", "GPT-OSS 20B", Provider::Groq, 32768, caps(true, true, false)),
                    ModelInfo::new("llama-3.3-70b-versatile", "Llama 3.3 70B", Provider::Groq, 32768, caps(false, true, false)),
                    ModelInfo::new("meta-llama/llama-4-scout-17b-16e-instruct", "Llama 4 Scout", Provider::Groq, 8192, caps(false, true, true)),
                    ModelInfo::new("moonshotai/kimi-k2-instruct", "Kimi K2", Provider::Groq, 16384, caps(false, true, false)),
                ],
            },
            ProviderGroup {
                provider: Provider::Xai,
                enabled: true,
                models: vec![
                    ModelInfo::new("grok-3", "Grok 3", Provider::Xai, 8192, caps(false, true, false)),
                    ModelInfo::new("grok-3-mini", "Grok 3 Mini", Provider::Xai, 8192, caps(true, true, false)),
                ],
            },
        ];

        Self { groups }
    }

    /// Look up a model by display name across enabled groups only
    pub fn get_model_info(&self, display_name: &str) -> Option<&ModelInfo> {
        self.groups
            .iter()
            .filter(|g| g.enabled)
            .flat_map(|g| g.models.iter())
            .find(|m| m.display_name == display_name)
    }

    /// False for unknown models, never an error
    pub fn is_reasoning_model(&self, display_name: &str) -> bool {
        self.get_model_info(display_name)
            .map(|m| m.capabilities.reasoning)
            .unwrap_or(false)
    }

    pub fn supports_tools(&self, display_name: &str) -> bool {
        self.get_model_info(display_name)
            .map(|m| m.capabilities.tools)
            .unwrap_or(false)
    }

    pub fn enabled_groups(&self) -> impl Iterator<Item = &ProviderGroup> {
        self.groups.iter().filter(|g| g.enabled)
    }

    /// Flip a provider group on or off (configuration override)
    pub fn set_enabled(&mut self, provider: Provider, enabled: bool) {
        for group in &mut self.groups {
            if group.provider == provider {
                group.enabled = enabled;
            }
        }
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_display_name() {
        let registry = ModelRegistry::builtin();
        let model = registry.get_model_info("Claude 3 Haiku").unwrap();
        assert_eq!(model.id, "claude-3-haiku-20240307");
        assert_eq!(model.provider, Provider::Anthropic);
    }

    #[test]
    fn unknown_model_degrades_to_none_and_false() {
        let registry = ModelRegistry::builtin();
        assert!(registry.get_model_info("No Such Model").is_none());
        assert!(!registry.is_reasoning_model("No Such Model"));
        assert!(!registry.supports_tools("No Such Model"));
    }

    #[test]
    fn disabled_group_is_invisible_to_lookup() {
        let mut registry = ModelRegistry::builtin();
        assert!(registry.get_model_info("GPT-OSS 120B").is_some());

        registry.set_enabled(Provider::Groq, false);
        // The model id is still valid for the provider SDK, but lookup must miss
        assert!(registry.get_model_info("GPT-OSS 120B").is_none());
        assert!(!registry.is_reasoning_model("GPT-OSS 120B"));

        // Other groups unaffected
        assert!(registry.get_model_info("Grok 3 Mini").is_some());
    }

    #[test]
    fn reasoning_flags() {
        let registry = ModelRegistry::builtin();
        assert!(registry.is_reasoning_model("DeepSeek R1 Distill 70B"));
        assert!(registry.is_reasoning_model("Grok 3 Mini"));
        assert!(!registry.is_reasoning_model("Claude 3 Haiku"));
        assert!(!registry.is_reasoning_model("Llama 3.3 70B"));
    }
}
