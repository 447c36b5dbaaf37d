//! Configuration, read once from the environment at process start.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Which LLM backend serves completions.
///
/// Fixed per deployment — no per-call branching and no silent fallback
/// from one provider to the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Locally hosted inference server (Ollama-compatible API).
    Local,
    /// Hosted commercial completion API (OpenAI-compatible).
    Hosted,
}

impl ProviderKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "local" | "ollama" => Some(Self::Local),
            "hosted" | "openai" => Some(Self::Hosted),
            _ => None,
        }
    }
}

/// Pipeline settings, immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Which backend to use for both model calls.
    pub provider: ProviderKind,
    /// Base URL of the local inference server.
    pub ollama_base_url: String,
    /// Model identifier on the local server.
    pub ollama_model: String,
    /// API key for the hosted provider. Required when `provider` is `Hosted`.
    pub openai_api_key: Option<SecretString>,
    /// Model identifier on the hosted provider.
    pub openai_model: String,
    /// Token budget per model call.
    pub max_tokens: u32,
    /// Sampling temperature for suggestion generation (classification
    /// always runs near-deterministic regardless of this value).
    pub temperature: f32,
    /// Per-request timeout for outbound provider calls, in seconds.
    pub request_timeout_secs: u64,
    /// Retries after the first attempt for transient provider failures.
    pub max_retries: u32,
    /// Upload size cap, enforced before extraction.
    pub max_upload_bytes: usize,
    /// Minimum non-whitespace characters after extraction.
    pub min_content_chars: usize,
    /// Confidence ceiling for the heuristic fallback classifier —
    /// signals reduced trust relative to a model-backed answer.
    pub heuristic_confidence_cap: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Local,
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "qwen2.5:3b".to_string(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            max_tokens: 500,
            temperature: 0.7,
            request_timeout_secs: 60,
            max_retries: 2,
            max_upload_bytes: 5 * 1024 * 1024,
            min_content_chars: 10,
            heuristic_confidence_cap: 0.6,
        }
    }
}

impl Settings {
    /// Build settings from environment variables.
    ///
    /// Fails fast on an unknown provider name or on a hosted provider
    /// without credentials.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let provider = match std::env::var("MAILTRIAGE_PROVIDER") {
            Ok(value) => {
                ProviderKind::parse(&value).ok_or_else(|| ConfigError::InvalidValue {
                    key: "MAILTRIAGE_PROVIDER".into(),
                    message: format!("'{value}' is not one of: local, hosted"),
                })?
            }
            Err(_) => defaults.provider,
        };

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);

        let heuristic_confidence_cap: f32 = env_parsed(
            "MAILTRIAGE_HEURISTIC_CAP",
            defaults.heuristic_confidence_cap,
        )?;
        if !(0.0..=1.0).contains(&heuristic_confidence_cap) || heuristic_confidence_cap == 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "MAILTRIAGE_HEURISTIC_CAP".into(),
                message: format!("'{heuristic_confidence_cap}' is outside (0.0, 1.0]"),
            });
        }

        if provider == ProviderKind::Hosted && openai_api_key.is_none() {
            return Err(ConfigError::MissingRequired {
                key: "OPENAI_API_KEY".into(),
                hint: "The hosted provider needs an API key: export OPENAI_API_KEY=sk-...".into(),
            });
        }

        Ok(Self {
            provider,
            ollama_base_url: std::env::var("OLLAMA_BASE_URL")
                .unwrap_or(defaults.ollama_base_url),
            ollama_model: std::env::var("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            openai_api_key,
            openai_model: std::env::var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            max_tokens: env_parsed("MAILTRIAGE_MAX_TOKENS", defaults.max_tokens)?,
            temperature: env_parsed("MAILTRIAGE_TEMPERATURE", defaults.temperature)?,
            request_timeout_secs: env_parsed(
                "MAILTRIAGE_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
            max_retries: env_parsed("MAILTRIAGE_MAX_RETRIES", defaults.max_retries)?,
            max_upload_bytes: env_parsed("MAILTRIAGE_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            min_content_chars: env_parsed(
                "MAILTRIAGE_MIN_CONTENT_CHARS",
                defaults.min_content_chars,
            )?,
            heuristic_confidence_cap,
        })
    }
}

/// Parse an optional env var, keeping the default when unset.
fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.into(),
            message: format!("could not parse '{value}'"),
        }),
        Err(_) => Ok(default),
    }
}
