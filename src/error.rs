//! Error types for mailtriage.

use std::time::Duration;

/// Top-level error type for the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Configuration-related errors. Raised once at process start, never per-request.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Document extraction errors. These abort the request with a specific,
/// user-facing reason — they are the only way a validated request fails.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("File too large: {size} bytes (maximum {max})")]
    FileTooLarge { size: usize, max: usize },

    #[error("Unsupported format: {0}. Accepted: .txt, .eml, .pdf")]
    UnsupportedFormat(String),

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("No extractable text in {0} content")]
    NoExtractableText(String),

    #[error("Content too short: {chars} non-whitespace characters (minimum {min})")]
    ContentTooShort { chars: usize, min: usize },

    #[error("Malformed {format} content: {reason}")]
    Malformed { format: String, reason: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} unavailable after {attempts} attempts")]
    Unavailable { provider: String, attempts: u32 },

    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Provider {provider} request timed out")]
    Timeout { provider: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

impl LlmError {
    /// Whether a bounded retry with the same request is worthwhile.
    ///
    /// Auth failures and malformed responses are fatal — retrying the
    /// identical request cannot fix them.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RequestFailed { .. } | Self::RateLimited { .. } | Self::Timeout { .. }
        )
    }
}

/// Result type alias for the pipeline.
pub type Result<T> = std::result::Result<T, Error>;
