//! System instruction assembly for the tool-calling path.
//!
//! The instruction text differs materially between web mode and arXiv mode;
//! that asymmetry is a behavioral contract, not incidental prompt text.

use qurse_models::GenerationRequest;

/// Web mode: the model must search first and never ask clarifying questions
pub const WEB_MODE_INSTRUCTIONS: &str = "\
You are a helpful assistant with access to web search.

When the user asks about current events, recent developments, specific facts, \
or anything that could have changed since your training data, call the \
aggressive_web_search tool IMMEDIATELY. Do not ask clarifying questions \
first; run the search with your best interpretation of the request and \
refine with a follow-up query if needed.

After searching, answer directly from the results and mention the sources \
you used. If the results are thin, say what you found rather than \
speculating.";

/// arXiv mode: the model must synthesize from the returned abstracts
pub const ARXIV_MODE_INSTRUCTIONS: &str = "\
You are a research assistant with access to arXiv search.

Use the arxiv_search tool to find papers relevant to the user's question. \
Base your answer on the paper abstracts the tool returns: synthesize what \
the papers collectively say, compare their approaches where relevant, and \
cite each paper by title and arXiv identifier. Do not invent results that \
the abstracts do not support.";

/// Assemble the system instruction for one tool-calling request
pub fn build_system_prompt(request: &GenerationRequest) -> String {
    let mut prompt = if request.arxiv_mode {
        ARXIV_MODE_INSTRUCTIONS.to_string()
    } else {
        WEB_MODE_INSTRUCTIONS.to_string()
    };

    if let Some(custom) = &request.custom_instructions {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            prompt.push_str("\n\nAdditional instructions from the user:\n");
            prompt.push_str(trimmed);
        }
    }

    if let Some(geo) = &request.geolocation {
        prompt.push_str(&format!(
            "\n\nThe user's approximate location is latitude {:.4}, longitude {:.4}; \
             the weather and location_detector tools can use it.",
            geo.latitude, geo.longitude
        ));
    }

    prompt
}
