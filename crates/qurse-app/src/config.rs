use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use qurse_models::{BudgetOverride, BudgetTable, ModelClass, ModelRegistry, Provider};

/// Optional TOML configuration: provider enable/disable flags and budget
/// table overrides. Everything else comes from the environment.
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: HashMap<String, bool>,
    #[serde(default)]
    pub budgets: HashMap<String, BudgetOverride>,
}

impl AppConfig {
    /// Load from a config file; a missing file means defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// The builtin registry with configured groups flipped on or off
    pub fn build_registry(&self) -> ModelRegistry {
        let mut registry = ModelRegistry::builtin();
        for (name, enabled) in &self.providers {
            if let Some(provider) = parse_provider(name) {
                registry.set_enabled(provider, *enabled);
            }
        }
        registry
    }

    /// The builtin budget table with configured rows merged in
    pub fn build_budgets(&self) -> BudgetTable {
        let mut table = BudgetTable::builtin();
        for (name, over) in &self.budgets {
            if let Some(class) = ModelClass::from_name(name) {
                table.apply_override(class, over);
            }
        }
        table
    }
}

fn parse_provider(name: &str) -> Option<Provider> {
    match name.to_lowercase().as_str() {
        "openai" => Some(Provider::OpenAi),
        "anthropic" => Some(Provider::Anthropic),
        "groq" => Some(Provider::Groq),
        "xai" => Some(Provider::Xai),
        _ => None,
    }
}
