//! One named predicate+extractor per known response shape, so new provider
//! formats can be added without touching existing ones.

use regex::Regex;
use serde_json::Value;

/// Models whose raw responses carry structured reasoning fields
pub fn is_xai_family(model_display_name: &str) -> bool {
    let name = model_display_name.to_lowercase();
    name.contains("grok") || name.contains("xai")
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Structured reasoning fields on a raw provider response, in priority order
pub fn provider_reasoning_fields(raw: &Value) -> Option<String> {
    if let Some(reasoning) = raw.get("reasoning").and_then(|v| v.as_str()) {
        if let Some(r) = non_empty(reasoning) {
            return Some(r);
        }
    }

    if let Some(reasoning) = raw.pointer("/steps/0/reasoning").and_then(|v| v.as_str()) {
        if let Some(r) = non_empty(reasoning) {
            return Some(r);
        }
    }

    if let Some(reasoning) = raw
        .pointer("/response/body/choices/0/message/reasoning_content")
        .and_then(|v| v.as_str())
    {
        if let Some(r) = non_empty(reasoning) {
            return Some(r);
        }
    }

    if let Some(details) = raw.pointer("/steps/0/reasoningDetails").and_then(|v| v.as_array()) {
        let joined = details
            .iter()
            .filter_map(|d| d.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("\n");
        if let Some(r) = non_empty(&joined) {
            return Some(r);
        }
    }

    None
}

/// Extract an inline `<tag>...</tag>` block: returns (reasoning, content with
/// every tag block removed). Case-insensitive, non-greedy.
pub fn extract_tagged(content: &str, tag: &str) -> Option<(String, String)> {
    let pattern = format!(r"(?is)<{tag}>(.*?)</{tag}>");
    let re = Regex::new(&pattern).ok()?;

    let captures = re.captures(content)?;
    let reasoning = non_empty(captures.get(1)?.as_str())?;
    let stripped = re.replace_all(content, "").trim().to_string();
    Some((reasoning, stripped))
}

/// Best-effort split of a numbered/bolded "Step N" preamble from a trailing
/// answer. Fallback only; may mis-match on pathological inputs.
pub fn step_heuristic(content: &str) -> Option<(String, String)> {
    let step_line = Regex::new(r"^\s*(?:\*\*)?(?:Step\s+\d+|\d+\.)[:.)\s]").ok()?;

    let lines: Vec<&str> = content.lines().collect();
    let mut step_count = 0;
    let mut last_step_line = 0;
    for (i, line) in lines.iter().enumerate() {
        if step_line.is_match(line) {
            step_count += 1;
            last_step_line = i;
        } else if line.trim().is_empty() && step_count > 0 {
            // Blank lines inside the preamble are fine
            continue;
        } else if step_count > 0 {
            break;
        } else {
            // The preamble must start at the top
            return None;
        }
    }

    if step_count < 2 || last_step_line + 1 >= lines.len() {
        return None;
    }

    let reasoning = non_empty(&lines[..=last_step_line].join("\n"))?;
    let answer = non_empty(&lines[last_step_line + 1..].join("\n"))?;
    Some((reasoning, answer))
}

/// Previously captured reasoning passed back through the raw response
pub fn captured_reasoning(raw: &Value) -> Option<String> {
    raw.get("combinedReasoning")
        .or_else(|| raw.pointer("/reasoning/combinedReasoning"))
        .and_then(|v| v.as_str())
        .and_then(non_empty)
}
