//! LLM integration for mailtriage.
//!
//! Supports:
//! - **Ollama**: locally hosted inference server (generate API)
//! - **OpenAI**: hosted chat completions API
//!
//! The backend is chosen once at startup via [`create_provider`]; both
//! implement the [`LlmProvider`] trait, so nothing downstream branches
//! on the provider.

pub mod provider;
pub(crate) mod retry;

pub use provider::{CompletionRequest, CompletionResponse, LlmProvider, OllamaProvider, OpenAiProvider};
pub use retry::complete_with_retry;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ProviderKind, Settings};
use crate::error::{ConfigError, Error};

/// Create an LLM provider from settings.
pub fn create_provider(settings: &Settings) -> Result<Arc<dyn LlmProvider>, Error> {
    let timeout = Duration::from_secs(settings.request_timeout_secs);
    match settings.provider {
        ProviderKind::Local => {
            let provider = OllamaProvider::new(
                &settings.ollama_base_url,
                &settings.ollama_model,
                timeout,
            )?;
            tracing::info!(
                base_url = %settings.ollama_base_url,
                model = %settings.ollama_model,
                "Using local provider (Ollama)"
            );
            Ok(Arc::new(provider))
        }
        ProviderKind::Hosted => {
            let api_key = settings.openai_api_key.clone().ok_or_else(|| {
                ConfigError::MissingRequired {
                    key: "OPENAI_API_KEY".into(),
                    hint: "The hosted provider needs an API key: export OPENAI_API_KEY=sk-..."
                        .into(),
                }
            })?;
            let provider = OpenAiProvider::new(api_key, &settings.openai_model, timeout)?;
            tracing::info!(model = %settings.openai_model, "Using hosted provider (OpenAI)");
            Ok(Arc::new(provider))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_local_provider() {
        let settings = Settings::default();
        let provider = create_provider(&settings).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model(), "qwen2.5:3b");
    }

    #[test]
    fn create_hosted_provider_requires_key() {
        let settings = Settings {
            provider: ProviderKind::Hosted,
            openai_api_key: None,
            ..Settings::default()
        };
        // The Ok side is a trait object without Debug, so unwrap the error
        // through Option instead of Result::unwrap_err.
        let err = create_provider(&settings).err().unwrap();
        assert!(matches!(err, Error::Config(ConfigError::MissingRequired { .. })));
    }

    #[test]
    fn create_hosted_provider_with_key() {
        let settings = Settings {
            provider: ProviderKind::Hosted,
            openai_api_key: Some(secrecy::SecretString::from("sk-test")),
            ..Settings::default()
        };
        let provider = create_provider(&settings).unwrap();
        assert_eq!(provider.name(), "openai");
    }
}
