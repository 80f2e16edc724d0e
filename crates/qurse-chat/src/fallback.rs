use qurse_models::{ChatMessage, SourceRecord};

/// Last resort when the loop produced nothing and no sources were captured
pub(crate) const APOLOGY_FALLBACK: &str =
    "I wasn't able to put together a complete answer for this request. Please try again.";

const SUMMARY_MAX_SOURCES: usize = 5;
const SUMMARY_SNIPPET_CHARS: usize = 200;

/// True for text that is raw tool-call markup rather than an answer
pub(crate) fn looks_like_tool_markup(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.contains("<tool_call") || trimmed.contains("</tool_call") {
        return true;
    }
    trimmed.starts_with('{') && trimmed.contains("\"arguments\"")
}

/// Recover a terminal answer after the tool loop.
///
/// Some reasoning models end a tool-calling turn without a trailing
/// natural-language answer; an empty message is a worse outcome than a
/// mechanically assembled summary, so this never returns an empty string.
///
/// Tiers: (1) the last assistant turn with usable plain text; (2) the full
/// text accumulated across all steps; (3) a templated summary of captured
/// sources; finally a generic apology.
pub(crate) fn recover_final_text(
    messages: &[ChatMessage],
    accumulated_text: &str,
    sources: &[SourceRecord],
    arxiv_mode: bool,
) -> String {
    for message in messages.iter().rev() {
        if message.role != "assistant" {
            continue;
        }
        let text = message.content.trim();
        if !text.is_empty() && !looks_like_tool_markup(text) {
            return text.to_string();
        }
    }

    let accumulated = accumulated_text.trim();
    if !accumulated.is_empty() && !looks_like_tool_markup(accumulated) {
        return accumulated.to_string();
    }

    if !sources.is_empty() {
        return synthesize_source_summary(sources, arxiv_mode);
    }

    APOLOGY_FALLBACK.to_string()
}

/// Deterministic summary built only from source record fields
pub(crate) fn synthesize_source_summary(sources: &[SourceRecord], arxiv_mode: bool) -> String {
    let mut lines = vec![if arxiv_mode {
        "I found these papers relevant to your question:".to_string()
    } else {
        "I found these sources relevant to your question:".to_string()
    }];

    for (i, source) in sources.iter().take(SUMMARY_MAX_SOURCES).enumerate() {
        let mut entry = format!("{}. **{}**", i + 1, source.title);
        if let Some(text) = source.abstract_text.as_ref().or(source.snippet.as_ref()) {
            let preview: String = text.chars().take(SUMMARY_SNIPPET_CHARS).collect();
            let ellipsis = if text.chars().count() > SUMMARY_SNIPPET_CHARS {
                "…"
            } else {
                ""
            };
            entry.push_str(&format!(" — {}{}", preview.trim(), ellipsis));
        }
        entry.push_str(&format!("\n   {}", source.url));
        lines.push(entry);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use qurse_models::sources::record_from_raw;
    use serde_json::json;

    fn sources() -> Vec<SourceRecord> {
        vec![
            record_from_raw(
                &json!({
                    "title": "Sparse Attention at Scale",
                    "url": "https://arxiv.org/abs/2402.00001",
                    "abstract": "We propose a sparse attention mechanism.",
                    "arxiv_id": "2402.00001"
                }),
                0,
            )
            .unwrap(),
            record_from_raw(
                &json!({
                    "title": "Some Web Result",
                    "url": "https://example.com/post",
                    "text": "A long snippet about the topic."
                }),
                1,
            )
            .unwrap(),
        ]
    }

    #[test]
    fn prefers_last_assistant_turn_with_text() {
        let messages = vec![
            ChatMessage::user("question"),
            ChatMessage::assistant("intermediate"),
            ChatMessage::tool("call_1", "tool output"),
            ChatMessage::assistant("final answer"),
        ];
        let text = recover_final_text(&messages, "", &sources(), false);
        assert_eq!(text, "final answer");
    }

    #[test]
    fn skips_whitespace_and_markup_turns() {
        let messages = vec![
            ChatMessage::assistant("earlier prose"),
            ChatMessage::assistant("  \n "),
            ChatMessage::assistant(r#"{"name": "aggressive_web_search", "arguments": "{}"}"#),
        ];
        let text = recover_final_text(&messages, "", &[], false);
        assert_eq!(text, "earlier prose");
    }

    #[test]
    fn falls_back_to_accumulated_text() {
        let messages = vec![ChatMessage::assistant("   ")];
        let text = recover_final_text(&messages, " streamed prose ", &[], false);
        assert_eq!(text, "streamed prose");
    }

    #[test]
    fn synthesizes_summary_from_sources_when_text_is_empty() {
        let messages = vec![ChatMessage::assistant("")];
        let text = recover_final_text(&messages, "  ", &sources(), true);
        assert!(text.contains("Sparse Attention at Scale"));
        assert!(text.contains("https://arxiv.org/abs/2402.00001"));
        assert!(text.contains("papers"));
    }

    #[test]
    fn apology_is_the_last_resort() {
        let text = recover_final_text(&[], "", &[], false);
        assert_eq!(text, APOLOGY_FALLBACK);
    }

    #[test]
    fn summary_truncates_long_snippets() {
        let long_text = "x".repeat(400);
        let source = record_from_raw(
            &json!({"title": "Long", "url": "https://e.com/a", "text": long_text}),
            0,
        )
        .unwrap();
        let summary = synthesize_source_summary(&[source], false);
        assert!(summary.contains('…'));
        assert!(summary.len() < 400);
    }

    #[test]
    fn tool_markup_detection() {
        assert!(looks_like_tool_markup("<tool_call>{\"name\":\"x\"}</tool_call>"));
        assert!(looks_like_tool_markup(r#"{"name": "search", "arguments": "{}"}"#));
        assert!(!looks_like_tool_markup("A normal sentence with { braces }."));
    }
}
