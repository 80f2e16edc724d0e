//! # qurse-chat
//!
//! The generation service: resolves a model against the registry, runs
//! one-shot or streaming generation, and drives the bounded tool-calling
//! loop with per-model-class budgets, request-scoped source capture, and
//! empty-terminal-answer recovery.

mod capture;
mod error;
mod fallback;
mod orchestrator;
pub mod prompts;
mod service;

pub use error::GenerationError;
pub use service::{ChatService, SearchConfig, DEFAULT_ONESHOT_MAX_TOKENS, DEFAULT_STREAM_MAX_TOKENS,
    DEFAULT_TEMPERATURE};
