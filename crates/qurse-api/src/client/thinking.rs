use std::sync::Arc;

use anyhow::Result;
use async_stream::stream;
use futures::StreamExt;

use qurse_models::ChatMessage;
use qurse_reasoning::strategies::extract_tagged;

use super::{CallOptions, ChunkStream, LlmClient, LlmResponse, StreamingChunk, ToolDefinition};

/// Middleware that splits inline `<think>...</think>` segments out of a
/// model's output so tagged open-weight models look like providers with a
/// structured reasoning field.
pub struct ThinkTagClient {
    inner: Arc<dyn LlmClient>,
    tag: String,
}

impl ThinkTagClient {
    pub fn new(inner: Arc<dyn LlmClient>) -> Self {
        Self::with_tag(inner, "think")
    }

    pub fn with_tag(inner: Arc<dyn LlmClient>, tag: &str) -> Self {
        Self {
            inner,
            tag: tag.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for ThinkTagClient {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDefinition>,
        opts: &CallOptions,
    ) -> Result<LlmResponse> {
        let mut response = self.inner.chat(messages, tools, opts).await?;

        // A structured reasoning field from the provider wins over tag parsing
        if response.message.reasoning.is_none() {
            if let Some((reasoning, stripped)) = extract_tagged(&response.message.content, &self.tag)
            {
                response.message.reasoning = Some(reasoning);
                response.message.content = stripped;
            }
        }

        Ok(response)
    }

    async fn chat_streaming(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDefinition>,
        opts: &CallOptions,
    ) -> Result<ChunkStream> {
        let mut inner_stream = self.inner.chat_streaming(messages, tools, opts).await?;
        let mut splitter = ThinkTagSplitter::new(&self.tag);

        let stream = stream! {
            while let Some(item) = inner_stream.next().await {
                match item {
                    Ok(chunk) => {
                        let (content, reasoning) = splitter.push(&chunk.delta);

                        let mut out = StreamingChunk {
                            delta: content,
                            reasoning_delta: chunk.reasoning_delta,
                            finish_reason: chunk.finish_reason,
                            usage: chunk.usage,
                        };
                        if !reasoning.is_empty() {
                            out.reasoning_delta = Some(match out.reasoning_delta.take() {
                                Some(existing) => existing + &reasoning,
                                None => reasoning,
                            });
                        }

                        if out.finish_reason.is_some() {
                            // Release anything still held back as a tag candidate
                            let (content_tail, reasoning_tail) = splitter.flush();
                            out.delta.push_str(&content_tail);
                            if !reasoning_tail.is_empty() {
                                out.reasoning_delta = Some(match out.reasoning_delta.take() {
                                    Some(existing) => existing + &reasoning_tail,
                                    None => reasoning_tail,
                                });
                            }
                        }

                        if !out.is_empty() {
                            yield Ok(out);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }

            let (content_tail, reasoning_tail) = splitter.flush();
            let mut tail = StreamingChunk {
                delta: content_tail,
                ..Default::default()
            };
            if !reasoning_tail.is_empty() {
                tail.reasoning_delta = Some(reasoning_tail);
            }
            if !tail.is_empty() {
                yield Ok(tail);
            }
        };

        Ok(Box::new(Box::pin(stream)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SplitterMode {
    Outside,
    Inside,
}

/// Stateful splitter that routes text between an open/close tag pair into a
/// reasoning channel. Tolerates tags fragmented across arbitrary chunk
/// boundaries.
pub struct ThinkTagSplitter {
    open_tag: String,
    close_tag: String,
    mode: SplitterMode,
    pending: String,
}

impl ThinkTagSplitter {
    pub fn new(tag: &str) -> Self {
        Self {
            open_tag: format!("<{}>", tag.to_lowercase()),
            close_tag: format!("</{}>", tag.to_lowercase()),
            mode: SplitterMode::Outside,
            pending: String::new(),
        }
    }

    /// Feed a chunk; returns (content, reasoning) text ready to emit
    pub fn push(&mut self, text: &str) -> (String, String) {
        self.pending.push_str(text);

        let mut content = String::new();
        let mut reasoning = String::new();

        loop {
            let needle = match self.mode {
                SplitterMode::Outside => &self.open_tag,
                SplitterMode::Inside => &self.close_tag,
            };

            if let Some(pos) = find_ascii_ci(&self.pending, needle) {
                let before = self.pending[..pos].to_string();
                let after = self.pending[pos + needle.len()..].to_string();
                match self.mode {
                    SplitterMode::Outside => {
                        content.push_str(&before);
                        self.mode = SplitterMode::Inside;
                    }
                    SplitterMode::Inside => {
                        reasoning.push_str(&before);
                        self.mode = SplitterMode::Outside;
                    }
                }
                self.pending = after;
                continue;
            }

            // No full tag; hold back the longest suffix that could still
            // become one, emit the rest
            let hold = longest_suffix_prefix(&self.pending, needle);
            let emit_len = self.pending.len() - hold;
            let emit = self.pending[..emit_len].to_string();
            self.pending = self.pending[emit_len..].to_string();
            match self.mode {
                SplitterMode::Outside => content.push_str(&emit),
                SplitterMode::Inside => reasoning.push_str(&emit),
            }
            break;
        }

        (content, reasoning)
    }

    /// Release any held-back partial tag text at end of stream
    pub fn flush(&mut self) -> (String, String) {
        let rest = std::mem::take(&mut self.pending);
        match self.mode {
            SplitterMode::Outside => (rest, String::new()),
            SplitterMode::Inside => (String::new(), rest),
        }
    }
}

/// Byte offset of the first ASCII-case-insensitive occurrence of `needle`
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let pat = needle.as_bytes();
    if pat.is_empty() || hay.len() < pat.len() {
        return None;
    }
    (0..=hay.len() - pat.len()).find(|&i| hay[i..i + pat.len()].eq_ignore_ascii_case(pat))
}

/// Length of the longest suffix of `haystack` that is a proper
/// case-insensitive prefix of `needle`
fn longest_suffix_prefix(haystack: &str, needle: &str) -> usize {
    let hay = haystack.as_bytes();
    let pat = needle.as_bytes();
    let max = pat.len().saturating_sub(1).min(hay.len());
    for len in (1..=max).rev() {
        if hay[hay.len() - len..].eq_ignore_ascii_case(&pat[..len]) {
            return len;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_chunks(chunks: &[&str]) -> (String, String) {
        let mut splitter = ThinkTagSplitter::new("think");
        let mut content = String::new();
        let mut reasoning = String::new();
        for chunk in chunks {
            let (c, r) = splitter.push(chunk);
            content.push_str(&c);
            reasoning.push_str(&r);
        }
        let (c, r) = splitter.flush();
        content.push_str(&c);
        reasoning.push_str(&r);
        (content, reasoning)
    }

    #[test]
    fn splits_single_chunk() {
        let (content, reasoning) = run_chunks(&["<think>plan it out</think>The answer is 4."]);
        assert_eq!(reasoning, "plan it out");
        assert_eq!(content, "The answer is 4.");
    }

    #[test]
    fn tag_split_across_chunk_boundaries() {
        // Same partition as the unsplit input, regardless of where the
        // chunk boundaries fall
        let whole = run_chunks(&["<think>step one</think>done"]);
        let fragmented = run_chunks(&["<th", "ink>step ", "one</thi", "nk>do", "ne"]);
        assert_eq!(whole, fragmented);
    }

    #[test]
    fn case_insensitive_tags() {
        let (content, reasoning) = run_chunks(&["<THINK>upper</THINK>rest"]);
        assert_eq!(reasoning, "upper");
        assert_eq!(content, "rest");
    }

    #[test]
    fn no_tag_passes_through() {
        let (content, reasoning) = run_chunks(&["just a plain ", "answer"]);
        assert_eq!(content, "just a plain answer");
        assert!(reasoning.is_empty());
    }

    #[test]
    fn unterminated_tag_flushes_as_reasoning() {
        let (content, reasoning) = run_chunks(&["<think>never closed"]);
        assert!(content.is_empty());
        assert_eq!(reasoning, "never closed");
    }

    #[test]
    fn angle_bracket_without_tag_is_not_held_forever() {
        let (content, reasoning) = run_chunks(&["a < b and c > d"]);
        assert_eq!(content, "a < b and c > d");
        assert!(reasoning.is_empty());
    }

    #[test]
    fn multiple_think_blocks() {
        let (content, reasoning) =
            run_chunks(&["<think>one</think>first<think>two</think>second"]);
        assert_eq!(reasoning, "onetwo");
        assert_eq!(content, "firstsecond");
    }
}
