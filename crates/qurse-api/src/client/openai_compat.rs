use std::time::Duration;

use anyhow::{Context, Result};
use async_stream::stream;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::time::sleep;

use qurse_logging::{log_request, log_request_to_file, log_response, log_response_to_file,
    log_stream_chunk, verbose_enabled};
use qurse_models::{ChatMessage, ChatRequest, ChatResponse, StreamChunk};

use super::{CallOptions, ChunkStream, LlmClient, LlmResponse, StreamingChunk, ToolDefinition};

/// Client for OpenAI-compatible chat completion APIs.
///
/// Groq, OpenAI and XAI all speak the same wire format; only base URL and
/// credentials differ.
pub struct OpenAiCompatClient {
    api_key: String,
    model: String,
    api_url: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(api_key: String, model: String, api_url: String) -> Self {
        Self {
            api_key,
            model,
            api_url,
            client: reqwest::Client::new(),
        }
    }

    fn build_request(
        &self,
        messages: Vec<ChatMessage>,
        tools: &[ToolDefinition],
        opts: &CallOptions,
        stream: bool,
    ) -> ChatRequest {
        // Strip the reasoning field from outgoing messages; only some
        // endpoints accept it and none need it echoed back
        let messages: Vec<ChatMessage> = messages
            .into_iter()
            .map(|mut msg| {
                msg.reasoning = None;
                msg
            })
            .collect();

        let tool_defs: Option<Vec<Value>> = if tools.is_empty() {
            None
        } else {
            Some(tools.iter().map(|t| t.to_openai()).collect())
        };

        ChatRequest {
            model: self.model.clone(),
            messages,
            tool_choice: tool_defs.as_ref().map(|_| "auto".to_string()),
            tools: tool_defs,
            stream: if stream { Some(true) } else { None },
            max_tokens: opts.max_tokens,
            temperature: opts.temperature,
        }
    }

    /// POST the request, retrying transient statuses up to the call's budget
    async fn send_with_retry(
        &self,
        request_body: &Value,
        opts: &CallOptions,
    ) -> Result<reqwest::Response> {
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(&self.api_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(request_body)
                .send()
                .await
                .context("request to chat completion endpoint failed")?;

            let status = response.status();
            let transient = status.as_u16() == 429 || status.is_server_error();
            if !transient || attempt >= opts.max_retries {
                return Ok(response);
            }

            let wait = Duration::from_secs(1 << attempt.min(3));
            attempt += 1;
            if verbose_enabled() {
                eprintln!(
                    "Transient status {} from {}, retry {}/{} in {:?}",
                    status, self.api_url, attempt, opts.max_retries, wait
                );
            }
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDefinition>,
        opts: &CallOptions,
    ) -> Result<LlmResponse> {
        let request = self.build_request(messages, &tools, opts, false);
        let request_body = serde_json::to_value(&request)?;

        let verbose = verbose_enabled();
        log_request(&self.api_url, &request_body, &self.api_key, verbose);
        let timestamp = log_request_to_file(&self.api_url, &request_body, &self.model, &self.api_key)
            .unwrap_or(0);

        let response = self.send_with_retry(&request_body, opts).await?;
        let status = response.status();
        let response_text = response.text().await?;

        log_response(&status, &response_text, verbose);
        let _ = log_response_to_file(&status, &response_text, timestamp, &self.model);

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "API request failed with status {}: {}",
                status,
                response_text
            ));
        }

        let raw: Value = serde_json::from_str(&response_text)
            .context("chat completion response was not valid JSON")?;
        let chat_response: ChatResponse = serde_json::from_value(raw.clone())
            .context("chat completion response had an unexpected shape")?;

        let mut message = chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .unwrap_or_else(|| ChatMessage::assistant(""));

        // DeepSeek-style endpoints report reasoning under a different key
        if message.reasoning.is_none() {
            if let Some(reasoning) = raw
                .pointer("/choices/0/message/reasoning_content")
                .and_then(|v| v.as_str())
            {
                message.reasoning = Some(reasoning.to_string());
            }
        }

        Ok(LlmResponse {
            message,
            usage: chat_response.usage,
            raw: Some(raw),
        })
    }

    async fn chat_streaming(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDefinition>,
        opts: &CallOptions,
    ) -> Result<ChunkStream> {
        let request = self.build_request(messages, &tools, opts, true);
        let request_body = serde_json::to_value(&request)?;

        let verbose = verbose_enabled();
        log_request(&self.api_url, &request_body, &self.api_key, verbose);
        let _ = log_request_to_file(&self.api_url, &request_body, &self.model, &self.api_key);

        let response = self.send_with_retry(&request_body, opts).await?;
        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            return Err(anyhow::anyhow!(
                "API request failed with status {}: {}",
                status,
                error_body
            ));
        }

        let mut byte_stream = response.bytes_stream();

        let stream = stream! {
            let mut buffer = String::new();
            let mut chunk_counter = 0usize;

            'outer: while let Some(chunk_result) = byte_stream.next().await {
                match chunk_result {
                    Ok(bytes) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));

                        // Process complete SSE events ("data: {json}\n\n")
                        while let Some(event_end) = buffer.find("\n\n") {
                            let event = buffer[..event_end].to_string();
                            buffer = buffer[event_end + 2..].to_string();

                            for line in event.lines() {
                                let Some(data) = line.strip_prefix("data: ") else {
                                    continue;
                                };

                                chunk_counter += 1;
                                log_stream_chunk(chunk_counter, data, verbose);

                                if data.trim() == "[DONE]" {
                                    break 'outer;
                                }

                                let Ok(chunk) = serde_json::from_str::<StreamChunk>(data) else {
                                    continue;
                                };

                                let mut out = StreamingChunk {
                                    usage: chunk.usage,
                                    ..Default::default()
                                };
                                if let Some(choice) = chunk.choices.first() {
                                    if let Some(content) = &choice.delta.content {
                                        out.delta.push_str(content);
                                    }
                                    out.reasoning_delta = choice
                                        .delta
                                        .reasoning
                                        .clone()
                                        .or_else(|| choice.delta.reasoning_content.clone());
                                    out.finish_reason = choice.finish_reason.clone();
                                }
                                if !out.is_empty() {
                                    yield Ok(out);
                                }
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(anyhow::anyhow!("Error reading stream: {}", e));
                        break;
                    }
                }
            }
        };

        Ok(Box::new(Box::pin(stream)))
    }
}
