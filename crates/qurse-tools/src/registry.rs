use std::collections::HashMap;
use std::sync::Arc;

use super::context::ToolContext;
use super::tool::{Tool, ToolParameters, ToolResult};

/// Registry for the tools offered to a single generation call
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tool_count", &self.tools.len())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Get a tool by name
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in sorted order
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Execute a tool by name
    pub async fn execute_tool(
        &self,
        name: &str,
        params: ToolParameters,
        context: &ToolContext,
    ) -> ToolResult {
        match self.get_tool(name) {
            Some(tool) => tool.execute(params, context).await,
            None => ToolResult::error(format!("Tool '{}' not found", name)),
        }
    }

    /// Name/description/schema triples for building wire tool definitions,
    /// sorted by tool name so the ordering stays stable across calls
    pub fn definitions(&self) -> Vec<(String, String, serde_json::Value)> {
        let mut tools: Vec<_> = self.tools.iter().collect();
        tools.sort_by_key(|(name, _)| name.as_str());
        tools
            .into_iter()
            .map(|(name, tool)| {
                (
                    name.clone(),
                    tool.description().to_string(),
                    tool.parameters_schema(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ParameterDefinition;

    struct MockTool {
        name: String,
    }

    #[async_trait::async_trait]
    impl Tool for MockTool {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            "A test tool"
        }

        fn parameters(&self) -> HashMap<String, ParameterDefinition> {
            HashMap::new()
        }

        async fn execute(&self, _params: ToolParameters, _context: &ToolContext) -> ToolResult {
            ToolResult::success("mock result".to_string())
        }
    }

    #[tokio::test]
    async fn register_lookup_and_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(MockTool {
            name: "test_tool".to_string(),
        });

        assert!(registry.has_tool("test_tool"));
        assert!(registry.get_tool("test_tool").is_some());

        let context = ToolContext::default();
        let result = registry
            .execute_tool("test_tool", ToolParameters::default(), &context)
            .await;
        assert!(result.success);
        assert_eq!(result.content, "mock result");
    }

    #[tokio::test]
    async fn unknown_tool_returns_error_result() {
        let registry = ToolRegistry::new();
        let context = ToolContext::default();
        let result = registry
            .execute_tool("nope", ToolParameters::default(), &context)
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("not found"));
    }

    #[test]
    fn definitions_are_sorted_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(MockTool {
            name: "zeta".to_string(),
        });
        registry.register(MockTool {
            name: "alpha".to_string(),
        });

        let names: Vec<String> = registry
            .definitions()
            .into_iter()
            .map(|(name, _, _)| name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(registry.tool_names(), names);
    }
}
