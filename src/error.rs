//! Error types for Smart Reply.

use std::time::Duration;

/// Startup error: anything that stops the service from being assembled.
/// Per-request failures stay in their own enums and map to `ApiError`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build {provider} client: {reason}")]
    ClientBuild { provider: String, reason: String },
}

/// LLM provider transport errors. None of these are retried by the generator.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Request shape errors, raised before any drafting happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} is too long: {length} > {max} characters")]
    TooLong {
        field: &'static str,
        length: usize,
        max: usize,
    },

    #[error("{field} out of range: {value} not in {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("too many avoid_phrases: {count} > {max}")]
    TooManyPhrases { count: usize, max: usize },
}

/// Errors from the draft generation orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Transport-level failure reaching the provider; surfaced immediately.
    #[error("Provider call failed: {0}")]
    Provider(#[from] LlmError),

    /// Every attempt returned JSON that failed to parse or validate.
    #[error("Provider output invalid after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Generator misconfigured: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
