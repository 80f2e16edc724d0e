use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use qurse_models::sources::record_from_raw;
use qurse_models::SourceRecord;

use crate::context::ToolContext;
use crate::param;
use crate::tool::{ParameterDefinition, Tool, ToolParameters, ToolResult};

pub const EXA_API_URL: &str = "https://api.exa.ai";

const DEFAULT_RESULTS_PER_QUERY: usize = 5;
const SNIPPET_MAX_CHARS: usize = 1000;

/// Client for the Exa search API
pub struct ExaSearchClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl ExaSearchClient {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            api_key,
            base_url: base_url
                .unwrap_or_else(|| EXA_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Run one search query; returns the provider's raw result objects.
    /// Deduplication across results is the provider's responsibility.
    pub async fn search(&self, query: &str, num_results: usize) -> Result<Vec<Value>> {
        let request = serde_json::json!({
            "query": query,
            "numResults": num_results,
            "type": "auto",
            "contents": {
                "text": { "maxCharacters": SNIPPET_MAX_CHARS }
            }
        });

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("request to search endpoint failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Search API error {}: {}",
                status,
                error_text
            ));
        }

        let body: Value = response
            .json()
            .await
            .context("search response was not valid JSON")?;

        Ok(body
            .get("results")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default())
    }
}

/// Web search tool backed by the Exa API.
///
/// Named "aggressive" because the instruction contract tells the model to
/// invoke it immediately instead of asking clarifying questions first.
pub struct AggressiveWebSearchTool {
    client: ExaSearchClient,
}

impl AggressiveWebSearchTool {
    pub fn new(client: ExaSearchClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for AggressiveWebSearchTool {
    fn name(&self) -> &str {
        crate::WEB_SEARCH_TOOL
    }

    fn description(&self) -> &str {
        "Search the web for current information. Accepts multiple queries and returns ranked results with content snippets. Use immediately when the user asks about recent events, news, or anything outside your training data."
    }

    fn parameters(&self) -> HashMap<String, ParameterDefinition> {
        HashMap::from([
            param!("queries", "array", "Search queries to run, most important first", required),
            param!("max_results", "integer", "Maximum results per query", optional, 5),
        ])
    }

    async fn execute(&self, params: ToolParameters, context: &ToolContext) -> ToolResult {
        let queries = match params.get_required::<Vec<String>>("queries") {
            Ok(queries) => queries,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        // Budget caps win over whatever the model asked for
        let queries: Vec<String> = match context.max_queries {
            Some(cap) => queries.into_iter().take(cap).collect(),
            None => queries,
        };

        let requested_results = params
            .get_optional::<usize>("max_results")
            .unwrap_or(None)
            .unwrap_or(DEFAULT_RESULTS_PER_QUERY);
        let per_query = match context.max_results {
            Some(cap) => requested_results.min(cap),
            None => requested_results,
        };

        let mut records: Vec<SourceRecord> = Vec::new();
        let mut sections: Vec<String> = Vec::new();

        // Queries run sequentially in array order; results concatenate in
        // that same order
        for query in &queries {
            match self.client.search(query, per_query).await {
                Ok(raw_results) => {
                    let mut lines = vec![format!("Results for \"{}\":", query)];
                    for raw in &raw_results {
                        let index = records.len();
                        if let Some(record) = record_from_raw(raw, index) {
                            lines.push(format_result_line(&record, lines.len()));
                            records.push(record);
                        }
                    }
                    if lines.len() == 1 {
                        lines.push("No results found.".to_string());
                    }
                    sections.push(lines.join("\n"));
                }
                Err(e) => {
                    sections.push(format!("Search for \"{}\" failed: {}", query, e));
                }
            }
        }

        if records.is_empty() && sections.iter().all(|s| s.contains("failed")) {
            return ToolResult::error("All search queries failed".to_string());
        }

        context.session.record_sources(records);
        ToolResult::success(sections.join("\n\n"))
    }
}

fn format_result_line(record: &SourceRecord, position: usize) -> String {
    let mut line = format!("{}. {} — {}", position, record.title, record.url);
    if let Some(snippet) = &record.snippet {
        let trimmed: String = snippet.chars().take(300).collect();
        line.push_str(&format!("\n   {}", trimmed));
    }
    line
}
