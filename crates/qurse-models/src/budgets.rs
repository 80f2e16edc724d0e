use serde::{Deserialize, Serialize};

use crate::registry::{ModelInfo, Provider};

/// Per-call limits applied by the tool-orchestration loop.
///
/// `None` means "no cap here": full context, caller-specified tokens, or the
/// search tool's own defaults. The numbers are tuned against hosted-model
/// rate limits; changing them changes cost and latency behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolBudget {
    /// How many trailing messages of the conversation to keep
    pub context_messages: Option<usize>,
    /// Hard per-call completion token cap
    pub max_tokens: Option<u32>,
    /// Maximum tool-calling round trips
    pub max_steps: usize,
    /// Maximum queries executed per search-tool invocation
    pub max_queries: Option<usize>,
    /// Maximum results fetched per query
    pub max_results: Option<usize>,
}

/// Budget classes the orchestrator distinguishes between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelClass {
    GroqReasoning,
    GroqOssReasoning,
    GroqTool,
    Default,
}

impl ModelClass {
    /// Classify a model for budget purposes
    pub fn of(model: &ModelInfo) -> Self {
        if model.provider == Provider::Groq {
            if model.capabilities.reasoning {
                if model.id.contains("gpt-oss") {
                    return ModelClass::GroqOssReasoning;
                }
                return ModelClass::GroqReasoning;
            }
            if model.capabilities.tools {
                return ModelClass::GroqTool;
            }
        }
        ModelClass::Default
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "groq_reasoning" => Some(ModelClass::GroqReasoning),
            "groq_oss_reasoning" => Some(ModelClass::GroqOssReasoning),
            "groq_tool" => Some(ModelClass::GroqTool),
            "default" => Some(ModelClass::Default),
            _ => None,
        }
    }
}

/// Partial override for one budget row, merged over the builtin table
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct BudgetOverride {
    pub context_messages: Option<usize>,
    pub max_tokens: Option<u32>,
    pub max_steps: Option<usize>,
    pub max_queries: Option<usize>,
    pub max_results: Option<usize>,
}

/// The step/token budget table, keyed by model class
#[derive(Debug, Clone)]
pub struct BudgetTable {
    groq_reasoning: ToolBudget,
    groq_oss_reasoning: ToolBudget,
    groq_tool: ToolBudget,
    default: ToolBudget,
}

impl BudgetTable {
    pub fn builtin() -> Self {
        Self {
            groq_reasoning: ToolBudget {
                context_messages: Some(2),
                max_tokens: Some(2048),
                max_steps: 5,
                max_queries: Some(2),
                max_results: Some(3),
            },
            groq_oss_reasoning: ToolBudget {
                context_messages: Some(2),
                max_tokens: Some(2048),
                max_steps: 6,
                max_queries: Some(2),
                max_results: Some(3),
            },
            groq_tool: ToolBudget {
                context_messages: Some(3),
                max_tokens: Some(2048),
                max_steps: 3,
                max_queries: None,
                max_results: None,
            },
            default: ToolBudget {
                context_messages: None,
                max_tokens: None,
                max_steps: 3,
                max_queries: None,
                max_results: None,
            },
        }
    }

    fn row(&self, class: ModelClass) -> &ToolBudget {
        match class {
            ModelClass::GroqReasoning => &self.groq_reasoning,
            ModelClass::GroqOssReasoning => &self.groq_oss_reasoning,
            ModelClass::GroqTool => &self.groq_tool,
            ModelClass::Default => &self.default,
        }
    }

    fn row_mut(&mut self, class: ModelClass) -> &mut ToolBudget {
        match class {
            ModelClass::GroqReasoning => &mut self.groq_reasoning,
            ModelClass::GroqOssReasoning => &mut self.groq_oss_reasoning,
            ModelClass::GroqTool => &mut self.groq_tool,
            ModelClass::Default => &mut self.default,
        }
    }

    pub fn budget_for(&self, model: &ModelInfo) -> ToolBudget {
        *self.row(ModelClass::of(model))
    }

    /// Merge a configured override into one row
    pub fn apply_override(&mut self, class: ModelClass, over: &BudgetOverride) {
        let row = self.row_mut(class);
        if let Some(context) = over.context_messages {
            row.context_messages = Some(context);
        }
        if let Some(tokens) = over.max_tokens {
            row.max_tokens = Some(tokens);
        }
        if let Some(steps) = over.max_steps {
            row.max_steps = steps;
        }
        if let Some(queries) = over.max_queries {
            row.max_queries = Some(queries);
        }
        if let Some(results) = over.max_results {
            row.max_results = Some(results);
        }
    }
}

impl Default for BudgetTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModelRegistry;
    use pretty_assertions::assert_eq;

    fn model(registry: &ModelRegistry, name: &str) -> ModelInfo {
        registry.get_model_info(name).unwrap().clone()
    }

    #[test]
    fn groq_reasoning_class_budget() {
        let registry = ModelRegistry::builtin();
        let table = BudgetTable::builtin();

        let budget = table.budget_for(&model(&registry, "DeepSeek R1 Distill 70B"));
        assert_eq!(budget.context_messages, Some(2));
        assert_eq!(budget.max_tokens, Some(2048));
        assert_eq!(budget.max_steps, 5);
        assert_eq!(budget.max_queries, Some(2));
        assert_eq!(budget.max_results, Some(3));
    }

    #[test]
    fn gpt_oss_family_gets_an_extra_step() {
        let registry = ModelRegistry::builtin();
        let table = BudgetTable::builtin();

        for name in ["GPT-OSS 120B", "GPT-OSS 20B"] {
            let budget = table.budget_for(&model(&registry, name));
            assert_eq!(budget.max_steps, 6, "{}", name);
            assert_eq!(budget.context_messages, Some(2));
        }
    }

    #[test]
    fn groq_non_reasoning_tool_class() {
        let registry = ModelRegistry::builtin();
        let table = BudgetTable::builtin();

        let budget = table.budget_for(&model(&registry, "Llama 3.3 70B"));
        assert_eq!(budget.context_messages, Some(3));
        assert_eq!(budget.max_tokens, Some(2048));
        assert_eq!(budget.max_steps, 3);
        assert_eq!(budget.max_queries, None);
        assert_eq!(budget.max_results, None);
    }

    #[test]
    fn other_providers_keep_full_context() {
        let registry = ModelRegistry::builtin();
        let table = BudgetTable::builtin();

        for name in ["Claude 3.5 Sonnet", "GPT-4o", "Grok 3 Mini"] {
            let budget = table.budget_for(&model(&registry, name));
            assert_eq!(budget.context_messages, None, "{}", name);
            assert_eq!(budget.max_tokens, None, "{}", name);
            assert_eq!(budget.max_steps, 3, "{}", name);
        }
    }

    #[test]
    fn override_replaces_only_the_targeted_row() {
        let registry = ModelRegistry::builtin();
        let mut table = BudgetTable::builtin();

        table.apply_override(
            ModelClass::GroqReasoning,
            &BudgetOverride {
                max_steps: Some(8),
                max_queries: Some(4),
                ..Default::default()
            },
        );

        let changed = table.budget_for(&model(&registry, "QwQ 32B"));
        assert_eq!(changed.max_steps, 8);
        assert_eq!(changed.max_queries, Some(4));
        // Untouched fields keep their builtin values
        assert_eq!(changed.max_tokens, Some(2048));

        let untouched = table.budget_for(&model(&registry, "GPT-OSS 120B"));
        assert_eq!(untouched.max_steps, 6);
    }
}
