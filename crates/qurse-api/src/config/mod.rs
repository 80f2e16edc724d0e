use std::env;

use qurse_models::Provider;

pub mod factory;

pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const XAI_API_URL: &str = "https://api.x.ai/v1/chat/completions";
pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";

/// Wire protocols the binding layer implements. Groq, OpenAI and XAI share
/// the OpenAI-compatible format; Anthropic has its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Groq,
    OpenAi,
    Anthropic,
    Xai,
}

impl From<Provider> for Backend {
    fn from(provider: Provider) -> Self {
        match provider {
            Provider::Groq => Backend::Groq,
            Provider::OpenAi => Backend::OpenAi,
            Provider::Anthropic => Backend::Anthropic,
            Provider::Xai => Backend::Xai,
        }
    }
}

impl Backend {
    pub fn default_url(&self) -> &'static str {
        match self {
            Backend::Groq => GROQ_API_URL,
            Backend::OpenAi => OPENAI_API_URL,
            Backend::Anthropic => ANTHROPIC_API_URL,
            Backend::Xai => XAI_API_URL,
        }
    }

    fn key_env_vars(&self) -> &'static [&'static str] {
        match self {
            Backend::Groq => &["GROQ_API_KEY"],
            Backend::OpenAi => &["OPENAI_API_KEY"],
            Backend::Anthropic => &["ANTHROPIC_API_KEY", "ANTHROPIC_AUTH_TOKEN"],
            Backend::Xai => &["XAI_API_KEY"],
        }
    }

    fn url_env_var(&self) -> &'static str {
        match self {
            Backend::Groq => "GROQ_BASE_URL",
            Backend::OpenAi => "OPENAI_BASE_URL",
            Backend::Anthropic => "ANTHROPIC_BASE_URL",
            Backend::Xai => "XAI_BASE_URL",
        }
    }

    /// Credential lookup from the environment; empty values count as unset
    pub fn api_key_from_env(&self) -> Option<String> {
        self.key_env_vars()
            .iter()
            .find_map(|var| env::var(var).ok())
            .filter(|key| !key.is_empty())
    }

    /// Endpoint URL, honoring a per-provider override variable
    pub fn resolve_url(&self, explicit: Option<String>) -> String {
        explicit
            .or_else(|| env::var(self.url_env_var()).ok().filter(|u| !u.is_empty()))
            .unwrap_or_else(|| self.default_url().to_string())
    }
}
