//! Bounded retry for transient provider failures.
//!
//! The request is never mutated between attempts, and a failure on one
//! provider never falls back to the other. Fatal errors (auth, malformed
//! response) propagate immediately.

use std::time::Duration;

use tracing::warn;

use crate::error::LlmError;
use crate::llm::provider::{CompletionRequest, CompletionResponse, LlmProvider};

/// Base delay between attempts; grows linearly with the attempt number.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

/// Call the provider, retrying transient failures up to `max_retries`
/// additional times. Exhaustion surfaces as [`LlmError::Unavailable`].
pub async fn complete_with_retry(
    provider: &dyn LlmProvider,
    request: CompletionRequest,
    max_retries: u32,
) -> Result<CompletionResponse, LlmError> {
    let mut attempt: u32 = 0;
    loop {
        match provider.complete(request.clone()).await {
            Ok(response) => return Ok(response),
            Err(e) if e.is_transient() => {
                attempt += 1;
                if attempt > max_retries {
                    warn!(
                        provider = provider.name(),
                        attempts = attempt,
                        error = %e,
                        "Provider unavailable, retries exhausted"
                    );
                    return Err(LlmError::Unavailable {
                        provider: provider.name().to_string(),
                        attempts: attempt,
                    });
                }
                warn!(
                    provider = provider.name(),
                    attempt,
                    max_retries,
                    error = %e,
                    "Transient provider failure, retrying"
                );
                tokio::time::sleep(RETRY_BASE_DELAY * attempt).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;

    /// Mock provider that fails `failures` times before succeeding.
    struct FlakyProvider {
        failures: u32,
        fatal: bool,
        calls: AtomicU32,
    }

    impl FlakyProvider {
        fn transient(failures: u32) -> Self {
            Self {
                failures,
                fatal: false,
                calls: AtomicU32::new(0),
            }
        }

        fn fatal() -> Self {
            Self {
                failures: u32::MAX,
                fatal: true,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fatal {
                return Err(LlmError::AuthFailed {
                    provider: "mock".into(),
                });
            }
            if call < self.failures {
                return Err(LlmError::Timeout {
                    provider: "mock".into(),
                });
            }
            Ok(CompletionResponse {
                content: "ok".into(),
            })
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let provider = FlakyProvider::transient(2);
        let request = CompletionRequest::new("s", "u");
        let response = complete_with_retry(&provider, request, 2).await.unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_becomes_unavailable() {
        let provider = FlakyProvider::transient(10);
        let request = CompletionRequest::new("s", "u");
        let err = complete_with_retry(&provider, request, 2).await.unwrap_err();
        match err {
            LlmError::Unavailable { provider, attempts } => {
                assert_eq!(provider, "mock");
                assert_eq!(attempts, 3);
            }
            other => panic!("Expected Unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fatal_error_not_retried() {
        let provider = FlakyProvider::fatal();
        let request = CompletionRequest::new("s", "u");
        let err = complete_with_retry(&provider, request, 5).await.unwrap_err();
        assert!(matches!(err, LlmError::AuthFailed { .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
