use thiserror::Error;

/// Typed failures of the generation service. HTTP status mapping is the
/// caller's responsibility.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Unknown model, disabled provider group, or missing credentials.
    /// Always recoverable; surfaced to the end user as "model not available".
    #[error("model not available: {0}")]
    ModelNotAvailable(String),

    /// The provider call itself rejected
    #[error("provider call failed: {0}")]
    Provider(#[from] anyhow::Error),
}
