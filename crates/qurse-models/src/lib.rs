// Models module - shared data structures for the chat core
pub mod budgets;
pub mod registry;
pub mod requests;
pub mod responses;
pub mod sources;
pub mod types;

// Re-export commonly used types
pub use types::{ChatMessage, FunctionCall, Geolocation, ToolCall};
pub use registry::{ModelCapabilities, ModelInfo, ModelRegistry, Provider, ProviderGroup};
pub use budgets::{BudgetOverride, BudgetTable, ModelClass, ToolBudget};
pub use requests::{ChatRequest, GenerationRequest};
pub use responses::{
    ChatResponse, Choice, FunctionDelta, GenerationResult, ReasoningBundle, StreamChoice,
    StreamChunk, StreamDelta, ToolCallDelta, Usage,
};
pub use sources::SourceRecord;
