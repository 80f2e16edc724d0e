use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

use qurse_api::{CallOptions, LlmClient, ToolDefinition};
use qurse_models::{ChatMessage, GenerationRequest, GenerationResult, ReasoningBundle, ToolBudget,
    Usage};
use qurse_reasoning::combine_step_reasoning;
use qurse_tools::{SearchSession, ToolContext, ToolParameters, ToolRegistry, ToolResult};

use crate::capture::collect_sources;
use crate::fallback::recover_final_text;
use crate::prompts::build_system_prompt;
use crate::service::DEFAULT_TEMPERATURE;

/// Retry budget on the tool path is raised to absorb transient
/// tool-call-format hiccups from the provider
const TOOL_CALL_MAX_RETRIES: u32 = 10;

/// Run the bounded tool-calling loop and assemble a terminal envelope.
///
/// Each step is fully received before the loop advances, so the
/// empty-answer recovery always sees the complete terminal message. Errors
/// propagate to the caller, which falls back to plain generation while
/// keeping whatever the session already captured.
pub(crate) async fn run_tool_loop(
    client: &Arc<dyn LlmClient>,
    budget: &ToolBudget,
    tools: &ToolRegistry,
    session: &SearchSession,
    request: &GenerationRequest,
) -> Result<GenerationResult> {
    let tool_context = ToolContext::new(session.clone())
        .with_geolocation(request.geolocation)
        .with_query_caps(budget.max_queries, budget.max_results);

    let mut messages = vec![ChatMessage::system(build_system_prompt(request))];
    messages.extend_from_slice(trimmed_context(&request.messages, budget));

    let tool_defs: Vec<ToolDefinition> = tools
        .definitions()
        .into_iter()
        .map(|(name, description, parameters)| ToolDefinition {
            name,
            description,
            parameters,
        })
        .collect();

    let opts = CallOptions {
        max_tokens: budget.max_tokens.or(request.max_tokens),
        temperature: Some(request.temperature.unwrap_or(DEFAULT_TEMPERATURE)),
        max_retries: TOOL_CALL_MAX_RETRIES,
    };

    let mut usage = Usage::default();
    let mut step_reasonings: Vec<String> = Vec::new();
    let mut accumulated_text = String::new();
    let mut last_raw: Option<Value> = None;

    for _step in 0..budget.max_steps {
        let response = client.chat(messages.clone(), tool_defs.clone(), &opts).await?;

        if let Some(step_usage) = response.usage {
            usage.add(&step_usage);
        }
        step_reasonings.push(response.message.reasoning.clone().unwrap_or_default());
        last_raw = response.raw;

        if !response.message.content.trim().is_empty() {
            accumulated_text.push_str(&response.message.content);
            accumulated_text.push('\n');
        }

        let tool_calls = response.message.tool_calls.clone().unwrap_or_default();
        messages.push(response.message);

        if tool_calls.is_empty() {
            break;
        }

        for call in &tool_calls {
            let result = match ToolParameters::from_json(&call.function.arguments) {
                Ok(params) => {
                    tools
                        .execute_tool(&call.function.name, params, &tool_context)
                        .await
                }
                Err(e) => ToolResult::error(format!("Invalid tool arguments: {}", e)),
            };
            messages.push(ChatMessage::tool(call.id.clone(), result.into_message_content()));
        }
    }

    let sources = collect_sources(session, last_raw.as_ref());
    let text = recover_final_text(&messages, &accumulated_text, &sources, request.arxiv_mode);

    let top_level = last_raw
        .as_ref()
        .and_then(|raw| raw.get("reasoning"))
        .and_then(|v| v.as_str());
    let reasoning = combine_step_reasoning(top_level, &step_reasonings).map(|combined| {
        ReasoningBundle {
            combined,
            steps: step_reasonings
                .iter()
                .filter(|s| !s.trim().is_empty())
                .cloned()
                .collect(),
        }
    });

    Ok(GenerationResult {
        text,
        usage,
        reasoning,
        sources,
    })
}

/// Keep only the trailing messages the budget allows
fn trimmed_context<'a>(messages: &'a [ChatMessage], budget: &ToolBudget) -> &'a [ChatMessage] {
    match budget.context_messages {
        Some(keep) if messages.len() > keep => &messages[messages.len() - keep..],
        _ => messages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use qurse_api::LlmResponse;
    use qurse_models::{BudgetTable, FunctionCall, ModelRegistry, ToolCall};
    use qurse_tools::{AggressiveWebSearchTool, ArxivClient, ArxivSearchTool, ExaSearchClient,
        LocationDetectorTool, WeatherTool};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Clone)]
    struct RecordedCall {
        message_count: usize,
        roles: Vec<String>,
        tool_names: Vec<String>,
        max_tokens: Option<u32>,
    }

    struct ScriptedClient {
        responses: Mutex<VecDeque<LlmResponse>>,
        calls: Arc<Mutex<Vec<RecordedCall>>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<LlmResponse>) -> (Arc<dyn LlmClient>, Arc<Mutex<Vec<RecordedCall>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let client = Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: calls.clone(),
            });
            (client, calls)
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedClient {
        async fn chat(
            &self,
            messages: Vec<ChatMessage>,
            tools: Vec<ToolDefinition>,
            opts: &CallOptions,
        ) -> Result<LlmResponse> {
            self.calls.lock().unwrap().push(RecordedCall {
                message_count: messages.len(),
                roles: messages.iter().map(|m| m.role.clone()).collect(),
                tool_names: tools.iter().map(|t| t.name.clone()).collect(),
                max_tokens: opts.max_tokens,
            });
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("script exhausted"))
        }

        async fn chat_streaming(
            &self,
            _messages: Vec<ChatMessage>,
            _tools: Vec<ToolDefinition>,
            _opts: &CallOptions,
        ) -> Result<qurse_api::ChunkStream> {
            Err(anyhow::anyhow!("not scripted"))
        }
    }

    fn assistant_response(content: &str, reasoning: Option<&str>) -> LlmResponse {
        LlmResponse {
            message: ChatMessage {
                reasoning: reasoning.map(|r| r.to_string()),
                ..ChatMessage::assistant(content)
            },
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            raw: None,
        }
    }

    fn tool_call_response(tool: &str, arguments: serde_json::Value, reasoning: Option<&str>) -> LlmResponse {
        LlmResponse {
            message: ChatMessage {
                role: "assistant".to_string(),
                tool_calls: Some(vec![ToolCall {
                    id: "call_1".to_string(),
                    tool_type: "function".to_string(),
                    function: FunctionCall {
                        name: tool.to_string(),
                        arguments: arguments.to_string(),
                    },
                }]),
                reasoning: reasoning.map(|r| r.to_string()),
                ..Default::default()
            },
            usage: Some(Usage {
                prompt_tokens: 20,
                completion_tokens: 10,
                total_tokens: 30,
            }),
            raw: None,
        }
    }

    async fn mock_search_server(expected_calls: Option<u64>) -> MockServer {
        let server = MockServer::start().await;
        let mock = Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"title": "Captured Result", "url": "https://example.com/a", "text": "snippet text"}
                ]
            })));
        let mock = match expected_calls {
            Some(n) => mock.expect(n),
            None => mock,
        };
        mock.mount(&server).await;
        server
    }

    fn web_toolset(server_uri: String) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(AggressiveWebSearchTool::new(ExaSearchClient::new(
            "test-key".to_string(),
            Some(server_uri),
        )));
        registry.register(WeatherTool::new(None));
        registry.register(LocationDetectorTool::new(None));
        registry
    }

    fn groq_reasoning_budget() -> ToolBudget {
        let registry = ModelRegistry::builtin();
        let model = registry.get_model_info("DeepSeek R1 Distill 70B").unwrap();
        BudgetTable::builtin().budget_for(model)
    }

    fn ten_user_messages() -> Vec<ChatMessage> {
        (0..10)
            .map(|i| ChatMessage::user(format!("message {}", i)))
            .collect()
    }

    #[tokio::test]
    async fn search_then_answer_captures_sources_and_reasoning() {
        let server = mock_search_server(None).await;
        let tools = web_toolset(server.uri());
        let (client, _calls) = ScriptedClient::new(vec![
            tool_call_response(
                "aggressive_web_search",
                serde_json::json!({"queries": ["rust release"]}),
                Some("I should search for this"),
            ),
            assistant_response("Rust 1.80 shipped in July.", None),
        ]);

        let session = SearchSession::new();
        let request = GenerationRequest {
            tools_enabled: true,
            ..GenerationRequest::new("GPT-OSS 120B", vec![ChatMessage::user("rust news?")])
        };

        let result = run_tool_loop(&client, &groq_reasoning_budget(), &tools, &session, &request)
            .await
            .unwrap();

        assert_eq!(result.text, "Rust 1.80 shipped in July.");
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].title, "Captured Result");
        assert_eq!(result.usage.total_tokens, 45);

        let reasoning = result.reasoning.unwrap();
        assert!(reasoning.combined.contains("Step 1: I should search for this"));
    }

    #[tokio::test]
    async fn budget_trims_context_caps_tokens_and_queries() {
        // Groq reasoning class: last 2 messages, 2048 tokens, 2 queries max.
        // The model asks for five queries; the mock's expect(2) verifies only
        // two search calls were made.
        let server = mock_search_server(Some(2)).await;
        let tools = web_toolset(server.uri());
        let (client, calls) = ScriptedClient::new(vec![
            tool_call_response(
                "aggressive_web_search",
                serde_json::json!({"queries": ["a", "b", "c", "d", "e"], "max_results": 5}),
                None,
            ),
            assistant_response("done", None),
        ]);

        let session = SearchSession::new();
        let request = GenerationRequest {
            tools_enabled: true,
            max_tokens: Some(9000),
            ..GenerationRequest::new("DeepSeek R1 Distill 70B", ten_user_messages())
        };

        run_tool_loop(&client, &groq_reasoning_budget(), &tools, &session, &request)
            .await
            .unwrap();

        let recorded = calls.lock().unwrap();
        // One system message plus the last 2 of the 10 caller messages
        assert_eq!(recorded[0].message_count, 3);
        assert_eq!(recorded[0].roles[0], "system");
        // The budget cap beats the caller's requested max_tokens
        assert_eq!(recorded[0].max_tokens, Some(2048));
    }

    #[tokio::test]
    async fn web_mode_offers_exactly_the_web_toolset() {
        let server = mock_search_server(None).await;
        let tools = web_toolset(server.uri());
        let (client, calls) = ScriptedClient::new(vec![assistant_response("no search needed", None)]);

        let session = SearchSession::new();
        let request = GenerationRequest {
            tools_enabled: true,
            ..GenerationRequest::new("GPT-OSS 120B", vec![ChatMessage::user("hi")])
        };

        run_tool_loop(&client, &groq_reasoning_budget(), &tools, &session, &request)
            .await
            .unwrap();

        let recorded = calls.lock().unwrap();
        assert_eq!(
            recorded[0].tool_names,
            vec!["aggressive_web_search", "location_detector", "weather"]
        );
        assert!(!recorded[0].tool_names.contains(&"arxiv_search".to_string()));
    }

    #[tokio::test]
    async fn empty_terminal_turn_synthesizes_from_sources() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<li class="arxiv-result">
                    <p class="list-title"><a href="https://arxiv.org/abs/2403.55555">arXiv:2403.55555</a></p>
                    <p class="title is-5 mathjax">Quantized Inference Tricks</p>
                    <p class="abstract"><span class="abstract-full">Quantization reduces cost.</span></p>
                </li>"#,
            ))
            .mount(&server)
            .await;

        let mut tools = ToolRegistry::new();
        tools.register(ArxivSearchTool::new(ArxivClient::new(Some(server.uri()))));

        // The model calls the tool, then terminates with a whitespace-only turn
        let (client, _calls) = ScriptedClient::new(vec![
            tool_call_response(
                "arxiv_search",
                serde_json::json!({"queries": ["quantization"]}),
                None,
            ),
            assistant_response("   \n", None),
        ]);

        let session = SearchSession::new();
        let request = GenerationRequest {
            tools_enabled: true,
            arxiv_mode: true,
            ..GenerationRequest::new("QwQ 32B", vec![ChatMessage::user("quantization papers?")])
        };

        let result = run_tool_loop(&client, &groq_reasoning_budget(), &tools, &session, &request)
            .await
            .unwrap();

        assert!(!result.text.trim().is_empty());
        assert!(result.text.contains("Quantized Inference Tricks"));
        assert_eq!(result.sources.len(), 1);
    }

    #[tokio::test]
    async fn loop_stops_at_the_step_budget() {
        let server = mock_search_server(None).await;
        let tools = web_toolset(server.uri());

        // Every scripted turn asks for another tool call; the loop must stop
        // after max_steps and still assemble an answer from captured sources
        let budget = groq_reasoning_budget();
        let responses: Vec<LlmResponse> = (0..budget.max_steps + 3)
            .map(|_| {
                tool_call_response(
                    "aggressive_web_search",
                    serde_json::json!({"queries": ["again"]}),
                    None,
                )
            })
            .collect();
        let (client, calls) = ScriptedClient::new(responses);

        let session = SearchSession::new();
        let request = GenerationRequest {
            tools_enabled: true,
            ..GenerationRequest::new("DeepSeek R1 Distill 70B", vec![ChatMessage::user("q")])
        };

        let result = run_tool_loop(&client, &budget, &tools, &session, &request)
            .await
            .unwrap();

        assert_eq!(calls.lock().unwrap().len(), budget.max_steps);
        assert!(!result.text.trim().is_empty());
    }

    #[tokio::test]
    async fn provider_error_propagates_with_sources_preserved_in_session() {
        let server = mock_search_server(None).await;
        let tools = web_toolset(server.uri());

        // First step searches successfully, second step blows up
        let (client, _calls) = ScriptedClient::new(vec![tool_call_response(
            "aggressive_web_search",
            serde_json::json!({"queries": ["ok"]}),
            None,
        )]);

        let session = SearchSession::new();
        let request = GenerationRequest {
            tools_enabled: true,
            ..GenerationRequest::new("GPT-OSS 120B", vec![ChatMessage::user("q")])
        };

        let err = run_tool_loop(&client, &groq_reasoning_budget(), &tools, &session, &request)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("script exhausted"));

        // The session still holds what was captured before the failure
        assert_eq!(session.sources().len(), 1);
    }

    #[tokio::test]
    async fn no_model_gating_for_arxiv_mode() {
        // arXiv mode with a non-Groq model is honored; compatibility
        // filtering is a UI concern, not this layer's
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let mut tools = ToolRegistry::new();
        tools.register(ArxivSearchTool::new(ArxivClient::new(Some(server.uri()))));

        let (client, calls) = ScriptedClient::new(vec![assistant_response("answer", None)]);

        let session = SearchSession::new();
        let request = GenerationRequest {
            tools_enabled: true,
            arxiv_mode: true,
            ..GenerationRequest::new("GPT-4o", vec![ChatMessage::user("papers?")])
        };

        let registry = ModelRegistry::builtin();
        let model = registry.get_model_info("GPT-4o").unwrap();
        let budget = BudgetTable::builtin().budget_for(model);

        let result = run_tool_loop(&client, &budget, &tools, &session, &request)
            .await
            .unwrap();

        assert_eq!(result.text, "answer");
        assert!(calls.lock().unwrap()[0]
            .tool_names
            .contains(&"arxiv_search".to_string()));
    }
}
