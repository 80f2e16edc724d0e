//! # qurse-reasoning
//!
//! Post-hoc normalizer for heterogeneous "chain-of-thought" response
//! formats. Given raw text and/or a raw provider response object, extracts a
//! reasoning segment and a final answer using an ordered list of pattern
//! strategies. Pure functions, no I/O.

pub mod strategies;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use strategies::{
    captured_reasoning, extract_tagged, is_xai_family, provider_reasoning_fields, step_heuristic,
};

/// Shown instead of an empty answer when stripping reasoning markup leaves
/// nothing behind
pub const EMPTY_ANSWER_FALLBACK: &str = "Response complete.";

/// Outcome of reasoning extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub reasoning: Option<String>,
    pub final_answer: String,
    pub has_reasoning: bool,
}

impl ParsedResponse {
    fn with_reasoning(reasoning: String, final_answer: String) -> Self {
        let final_answer = if final_answer.trim().is_empty() {
            EMPTY_ANSWER_FALLBACK.to_string()
        } else {
            final_answer.trim().to_string()
        };
        Self {
            reasoning: Some(reasoning),
            final_answer,
            has_reasoning: true,
        }
    }

    fn plain(content: &str) -> Self {
        Self {
            reasoning: None,
            final_answer: content.trim().to_string(),
            has_reasoning: false,
        }
    }
}

/// Extract reasoning and final answer from a model response.
///
/// Strategies are tried in order until one yields non-empty reasoning:
/// provider-structured fields (XAI family only), inline `<think>` tags,
/// inline `<thinking>` tags, a numbered-step heuristic, and finally a
/// captured-reasoning passthrough. No match degrades to the content verbatim.
pub fn parse(
    content: &str,
    model_display_name: Option<&str>,
    raw_response: Option<&Value>,
) -> ParsedResponse {
    // Provider-structured fields, only for models known to populate them
    if let (Some(model), Some(raw)) = (model_display_name, raw_response) {
        if is_xai_family(model) {
            if let Some(reasoning) = provider_reasoning_fields(raw) {
                return ParsedResponse::with_reasoning(reasoning, content.to_string());
            }
        }
    }

    for tag in ["think", "thinking"] {
        if let Some((reasoning, stripped)) = extract_tagged(content, tag) {
            return ParsedResponse::with_reasoning(reasoning, stripped);
        }
    }

    if let Some((reasoning, answer)) = step_heuristic(content.trim()) {
        return ParsedResponse::with_reasoning(reasoning, answer);
    }

    if let Some(raw) = raw_response {
        if let Some(reasoning) = captured_reasoning(raw) {
            return ParsedResponse::with_reasoning(reasoning, content.to_string());
        }
    }

    ParsedResponse::plain(content)
}

/// True for trivial placeholder reasoning like a bare `**Searching**` header
pub fn is_placeholder_reasoning(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.chars().count() > 20 {
        return false;
    }
    let re = regex::Regex::new(r"^\*\*\w+\*\*$").expect("placeholder pattern is valid");
    re.is_match(trimmed)
}

/// Assemble the combined reasoning for a tool-calling run: any top-level
/// reasoning first, then each step's reasoning prefixed `Step N:`, joined
/// with a `---` separator. Placeholder fragments are dropped.
pub fn combine_step_reasoning(top_level: Option<&str>, steps: &[String]) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    if let Some(top) = top_level {
        let trimmed = top.trim();
        if !trimmed.is_empty() && !is_placeholder_reasoning(trimmed) {
            parts.push(trimmed.to_string());
        }
    }

    for (i, step) in steps.iter().enumerate() {
        let trimmed = step.trim();
        if trimmed.is_empty() || is_placeholder_reasoning(trimmed) {
            continue;
        }
        parts.push(format!("Step {}: {}", i + 1, trimmed));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n---\n"))
    }
}
