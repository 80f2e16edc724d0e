use anyhow::{Context, Result};
use async_stream::stream;
use futures::StreamExt;
use serde_json::Value;

use qurse_logging::{log_request, log_request_to_file, log_response, log_response_to_file,
    verbose_enabled};
use qurse_models::{ChatMessage, FunctionCall, ToolCall, Usage};

use super::{CallOptions, ChunkStream, LlmClient, LlmResponse, StreamingChunk, ToolDefinition};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Client for the native Anthropic messages API
pub struct AnthropicClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        // Ensure base_url doesn't end with a slash
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            api_key,
            model,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn convert_messages(&self, messages: Vec<ChatMessage>) -> Vec<Value> {
        messages
            .into_iter()
            .filter_map(|msg| {
                // System messages are handled separately via the system field
                if msg.role == "system" {
                    return None;
                }

                // Only user/assistant roles are allowed on the wire
                let anthropic_role = if msg.role == "user" || msg.role == "assistant" {
                    msg.role.clone()
                } else if msg.role == "tool" {
                    "user".to_string()
                } else {
                    "user".to_string()
                };

                let content = if msg.role == "tool" {
                    // Tool result messages need special handling
                    vec![serde_json::json!({
                        "type": "tool_result",
                        "tool_use_id": msg.tool_call_id.unwrap_or_default(),
                        "content": msg.content
                    })]
                } else if let Some(tool_calls) = msg.tool_calls {
                    // Assistant message with tool calls
                    let mut content = vec![];
                    if !msg.content.is_empty() {
                        content.push(serde_json::json!({
                            "type": "text",
                            "text": msg.content
                        }));
                    }
                    for tool_call in tool_calls {
                        content.push(serde_json::json!({
                            "type": "tool_use",
                            "id": tool_call.id,
                            "name": tool_call.function.name,
                            "input": serde_json::from_str::<Value>(&tool_call.function.arguments)
                                .unwrap_or_else(|_| serde_json::json!({}))
                        }));
                    }
                    content
                } else {
                    vec![serde_json::json!({
                        "type": "text",
                        "text": msg.content
                    })]
                };

                Some(serde_json::json!({
                    "role": anthropic_role,
                    "content": content
                }))
            })
            .collect()
    }

    fn build_request(
        &self,
        messages: Vec<ChatMessage>,
        tools: &[ToolDefinition],
        opts: &CallOptions,
        stream: bool,
    ) -> Value {
        let system_messages: Vec<String> = messages
            .iter()
            .filter(|msg| msg.role == "system")
            .map(|msg| msg.content.clone())
            .collect();

        let combined_system = if system_messages.is_empty() {
            None
        } else {
            Some(system_messages.join("\n\n"))
        };

        let anthropic_messages = self.convert_messages(messages);

        let mut request = serde_json::json!({
            "model": self.model,
            "messages": anthropic_messages,
            "max_tokens": opts.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });

        if let Some(temperature) = opts.temperature {
            request["temperature"] = serde_json::json!(temperature);
        }
        if !tools.is_empty() {
            request["tools"] = Value::Array(tools.iter().map(|t| t.to_anthropic()).collect());
            request["tool_choice"] = serde_json::json!({"type": "auto"});
        }
        if let Some(system_content) = combined_system {
            request["system"] = Value::String(system_content);
        }
        if stream {
            request["stream"] = Value::Bool(true);
        }

        request
    }

    fn response_to_message(&self, response: &Value) -> ChatMessage {
        let empty_vec = vec![];
        let content = response["content"].as_array().unwrap_or(&empty_vec);

        let mut text_content = String::new();
        let mut reasoning = String::new();
        let mut tool_calls = Vec::new();

        for item in content {
            match item["type"].as_str() {
                Some("text") => {
                    if let Some(text) = item["text"].as_str() {
                        text_content.push_str(text);
                    }
                }
                Some("thinking") => {
                    if let Some(text) = item["thinking"].as_str() {
                        reasoning.push_str(text);
                    }
                }
                Some("tool_use") => {
                    if let (Some(name), Some(id)) = (item["name"].as_str(), item["id"].as_str()) {
                        tool_calls.push(ToolCall {
                            id: id.to_string(),
                            tool_type: "function".to_string(),
                            function: FunctionCall {
                                name: name.to_string(),
                                arguments: item["input"].to_string(),
                            },
                        });
                    }
                }
                _ => {}
            }
        }

        ChatMessage {
            role: response["role"].as_str().unwrap_or("assistant").to_string(),
            content: text_content,
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            tool_call_id: None,
            name: None,
            reasoning: if reasoning.is_empty() {
                None
            } else {
                Some(reasoning)
            },
        }
    }

    /// Parse a single SSE line and return a streaming chunk if it carries
    /// text, thinking, or a terminal event
    fn parse_sse_line(line: &str) -> Option<StreamingChunk> {
        let data = line.strip_prefix("data: ")?;

        let json = serde_json::from_str::<Value>(data).ok()?;
        match json["type"].as_str()? {
            "content_block_delta" => {
                let delta = json.get("delta")?;
                if let Some(text) = delta.get("text").and_then(|v| v.as_str()) {
                    return Some(StreamingChunk {
                        delta: text.to_string(),
                        ..Default::default()
                    });
                }
                if let Some(thinking) = delta.get("thinking").and_then(|v| v.as_str()) {
                    return Some(StreamingChunk {
                        reasoning_delta: Some(thinking.to_string()),
                        ..Default::default()
                    });
                }
                None
            }
            "content_block_start" => {
                let text = json
                    .get("content_block")
                    .and_then(|b| b.get("text"))
                    .and_then(|v| v.as_str())?;
                if text.is_empty() {
                    return None;
                }
                Some(StreamingChunk {
                    delta: text.to_string(),
                    ..Default::default()
                })
            }
            "message_delta" => {
                let usage = json.get("usage").map(|u| Usage {
                    prompt_tokens: u["input_tokens"].as_u64().unwrap_or(0) as u32,
                    completion_tokens: u["output_tokens"].as_u64().unwrap_or(0) as u32,
                    total_tokens: (u["input_tokens"].as_u64().unwrap_or(0)
                        + u["output_tokens"].as_u64().unwrap_or(0)) as u32,
                });
                usage.map(|usage| StreamingChunk {
                    usage: Some(usage),
                    ..Default::default()
                })
            }
            "message_stop" => Some(StreamingChunk {
                finish_reason: Some("stop".to_string()),
                ..Default::default()
            }),
            // ping, message_start, content_block_stop and friends are ignored
            _ => None,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDefinition>,
        opts: &CallOptions,
    ) -> Result<LlmResponse> {
        let request = self.build_request(messages, &tools, opts, false);

        let verbose = verbose_enabled();
        log_request(&self.messages_url(), &request, &self.api_key, verbose);
        let timestamp =
            log_request_to_file(&self.messages_url(), &request, &self.model, &self.api_key)
                .unwrap_or(0);

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("request to Anthropic messages endpoint failed")?;

        let status = response.status();
        let response_text = response.text().await?;

        log_response(&status, &response_text, verbose);
        let _ = log_response_to_file(&status, &response_text, timestamp, &self.model);

        if !status.is_success() {
            return Err(anyhow::anyhow!("Anthropic API error: {}", response_text));
        }

        let response_json: Value = serde_json::from_str(&response_text)
            .context("Anthropic response was not valid JSON")?;

        let message = self.response_to_message(&response_json);

        let usage = response_json.get("usage").map(|u| Usage {
            prompt_tokens: u["input_tokens"].as_u64().unwrap_or(0) as u32,
            completion_tokens: u["output_tokens"].as_u64().unwrap_or(0) as u32,
            total_tokens: (u["input_tokens"].as_u64().unwrap_or(0)
                + u["output_tokens"].as_u64().unwrap_or(0)) as u32,
        });

        Ok(LlmResponse {
            message,
            usage,
            raw: Some(response_json),
        })
    }

    async fn chat_streaming(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDefinition>,
        opts: &CallOptions,
    ) -> Result<ChunkStream> {
        let request = self.build_request(messages, &tools, opts, true);

        let verbose = verbose_enabled();
        log_request(&self.messages_url(), &request, &self.api_key, verbose);
        let _ = log_request_to_file(&self.messages_url(), &request, &self.model, &self.api_key);

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&request)
            .send()
            .await
            .context("request to Anthropic messages endpoint failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Anthropic API streaming error: {}",
                error_text
            ));
        }

        let mut byte_stream = response.bytes_stream();

        let stream = stream! {
            let mut line_buffer = String::new();

            while let Some(chunk_result) = byte_stream.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        line_buffer.push_str(&String::from_utf8_lossy(&chunk));

                        while let Some(newline) = line_buffer.find('\n') {
                            let line = line_buffer[..newline].to_string();
                            line_buffer = line_buffer[newline + 1..].to_string();

                            if let Some(streaming_chunk) = Self::parse_sse_line(&line) {
                                yield Ok(streaming_chunk);
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(anyhow::anyhow!("Stream error: {}", e));
                        break;
                    }
                }
            }

            if let Some(streaming_chunk) = Self::parse_sse_line(&line_buffer) {
                yield Ok(streaming_chunk);
            }
        };

        Ok(Box::new(Box::pin(stream)))
    }
}
