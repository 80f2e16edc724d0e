use std::sync::Arc;

use qurse_models::ModelRegistry;

use crate::client::{
    anthropic::AnthropicClient, openai_compat::OpenAiCompatClient, thinking::ThinkTagClient,
    LlmClient,
};
use crate::config::Backend;

/// Client factory for creating LLM clients
pub struct ClientFactory;

impl ClientFactory {
    /// Create an LLM client for the given backend.
    ///
    /// Returns `None` when no credential is available, so that resolution in
    /// a context without provider access degrades instead of erroring.
    pub fn create(
        backend: Backend,
        api_key: Option<String>,
        model: String,
        api_url: Option<String>,
    ) -> Option<Arc<dyn LlmClient>> {
        let key = api_key
            .filter(|k| !k.is_empty())
            .or_else(|| backend.api_key_from_env())?;
        let url = backend.resolve_url(api_url);

        match backend {
            Backend::Anthropic => Some(Arc::new(AnthropicClient::new(key, model, url))),
            // Groq, OpenAI and XAI all speak the OpenAI-compatible format
            Backend::Groq | Backend::OpenAi | Backend::Xai => {
                Some(Arc::new(OpenAiCompatClient::new(key, model, url)))
            }
        }
    }
}

/// Map a display name to a callable model handle.
///
/// `None` for unknown models and for providers without credentials; the
/// caller surfaces "model not available" rather than crashing. Reasoning
/// models come back wrapped in the think-tag extraction middleware.
pub fn resolve_language_model(
    registry: &ModelRegistry,
    display_name: &str,
) -> Option<Arc<dyn LlmClient>> {
    let model = registry.get_model_info(display_name)?;
    let backend = Backend::from(model.provider);
    let client = ClientFactory::create(backend, None, model.id.clone(), None)?;

    if model.capabilities.reasoning {
        Some(Arc::new(ThinkTagClient::new(client)))
    } else {
        Some(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_provider_env() {
        for var in [
            "GROQ_API_KEY",
            "OPENAI_API_KEY",
            "ANTHROPIC_API_KEY",
            "ANTHROPIC_AUTH_TOKEN",
            "XAI_API_KEY",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn missing_credentials_resolve_to_none() {
        clear_provider_env();
        let registry = ModelRegistry::builtin();
        assert!(resolve_language_model(&registry, "Claude 3 Haiku").is_none());
        assert!(resolve_language_model(&registry, "GPT-OSS 120B").is_none());
    }

    #[test]
    #[serial]
    fn unknown_model_resolves_to_none() {
        clear_provider_env();
        std::env::set_var("GROQ_API_KEY", "test-key");
        let registry = ModelRegistry::builtin();
        assert!(resolve_language_model(&registry, "No Such Model").is_none());
        std::env::remove_var("GROQ_API_KEY");
    }

    #[test]
    #[serial]
    fn credentialed_model_resolves() {
        clear_provider_env();
        std::env::set_var("GROQ_API_KEY", "test-key");
        let registry = ModelRegistry::builtin();
        assert!(resolve_language_model(&registry, "Llama 3.3 70B").is_some());
        // Reasoning models resolve too (wrapped in the think-tag middleware)
        assert!(resolve_language_model(&registry, "DeepSeek R1 Distill 70B").is_some());
        std::env::remove_var("GROQ_API_KEY");
    }

    #[test]
    #[serial]
    fn anthropic_auth_token_is_accepted() {
        clear_provider_env();
        std::env::set_var("ANTHROPIC_AUTH_TOKEN", "test-token");
        let registry = ModelRegistry::builtin();
        assert!(resolve_language_model(&registry, "Claude 3 Haiku").is_some());
        std::env::remove_var("ANTHROPIC_AUTH_TOKEN");
    }

    #[test]
    #[serial]
    fn empty_env_value_counts_as_unset() {
        clear_provider_env();
        std::env::set_var("XAI_API_KEY", "");
        let registry = ModelRegistry::builtin();
        assert!(resolve_language_model(&registry, "Grok 3").is_none());
        std::env::remove_var("XAI_API_KEY");
    }
}
