//! Pipeline orchestrator — the single entry point the surrounding HTTP
//! layer calls.
//!
//! Sequences extraction (file path only) → classification → conditional
//! suggestion generation, and assembles the final result. Holds no state
//! across calls; the two model calls of a request are strictly sequential
//! because suggestions depend on the classification outcome.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::config::Settings;
use crate::error::Result;
use crate::extract::DocumentExtractor;
use crate::llm::LlmProvider;
use crate::pipeline::classifier::Classifier;
use crate::pipeline::heuristics::HeuristicClassifier;
use crate::pipeline::suggestions::SuggestionGenerator;
use crate::pipeline::types::{ClassificationSource, Label, PipelineResult};

pub struct EmailPipeline {
    extractor: DocumentExtractor,
    classifier: Classifier,
    suggestions: SuggestionGenerator,
}

impl EmailPipeline {
    pub fn new(llm: Arc<dyn LlmProvider>, settings: &Settings) -> Self {
        let heuristics = HeuristicClassifier::new(settings.heuristic_confidence_cap);
        Self {
            extractor: DocumentExtractor::new(settings),
            classifier: Classifier::new(
                Arc::clone(&llm),
                heuristics,
                settings.max_tokens,
                settings.max_retries,
            ),
            suggestions: SuggestionGenerator::new(
                llm,
                settings.max_tokens,
                settings.temperature,
                settings.max_retries,
            ),
        }
    }

    /// Classify raw email text.
    pub async fn classify(&self, text: &str) -> Result<PipelineResult> {
        self.extractor.validate_text(text)?;
        Ok(self.run(text).await)
    }

    /// Classify an uploaded file (.txt, .eml, .pdf).
    pub async fn classify_file(&self, bytes: &[u8], filename: &str) -> Result<PipelineResult> {
        let content = self.extractor.extract(bytes, filename)?;
        Ok(self.run(&content.text).await)
    }

    /// Run classification and, for productive emails, suggestion generation.
    ///
    /// Infallible past input validation: the classifier degrades to its
    /// heuristic path and suggestions degrade to an empty list, so every
    /// validated request gets a result.
    async fn run(&self, text: &str) -> PipelineResult {
        let classification = self.classifier.classify(text).await;

        let suggestions = if classification.label == Label::Productive {
            self.suggestions.generate(text).await
        } else {
            Vec::new()
        };

        let degraded = classification.source == ClassificationSource::Heuristic
            || (classification.label == Label::Productive && suggestions.is_empty());

        info!(
            label = classification.label.as_str(),
            confidence = classification.confidence,
            suggestions = suggestions.len(),
            degraded,
            "Pipeline complete"
        );

        PipelineResult {
            classification: classification.label,
            confidence: classification.confidence,
            reasoning: classification.reasoning,
            suggestions,
            degraded,
            processed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{Error, ExtractError, LlmError};
    use crate::llm::{CompletionRequest, CompletionResponse};
    use crate::pipeline::types::Tone;

    /// Mock provider that answers the classification call first, then the
    /// suggestion call, from a scripted queue. `None` entries fail.
    struct ScriptedProvider {
        responses: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Option<&str>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .rev()
                        .map(|r| r.map(String::from))
                        .collect(),
                ),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, LlmError> {
            let next = self.responses.lock().unwrap().pop().flatten();
            match next {
                Some(content) => Ok(CompletionResponse { content }),
                None => Err(LlmError::Timeout {
                    provider: "mock".into(),
                }),
            }
        }
    }

    fn settings() -> Settings {
        Settings {
            max_retries: 0,
            ..Settings::default()
        }
    }

    const CLASSIFY_PRODUCTIVE: &str =
        r#"{"classification": "productive", "confidence": 0.9, "reasoning": "Asks for a report"}"#;
    const CLASSIFY_UNPRODUCTIVE: &str =
        r#"{"classification": "unproductive", "confidence": 0.95, "reasoning": "Greeting only"}"#;
    const SUGGESTIONS_OK: &str = r#"{"suggestions": [
        {"title": "Confirm", "content": "Envio até as 14h.", "tone": "formal"},
        {"title": "Ack", "content": "Pode deixar!", "tone": "casual"}
    ]}"#;

    #[tokio::test]
    async fn productive_email_gets_suggestions() {
        let llm = ScriptedProvider::new(vec![Some(CLASSIFY_PRODUCTIVE), Some(SUGGESTIONS_OK)]);
        let pipeline = EmailPipeline::new(llm, &settings());

        let result = pipeline
            .classify("Preciso do relatório até amanhã às 14h, é urgente.")
            .await
            .unwrap();

        assert_eq!(result.classification, Label::Productive);
        assert!(result.confidence > 0.5);
        assert!(!result.suggestions.is_empty());
        assert!(result.suggestions.iter().all(|s| Tone::ALL.contains(&s.tone)));
        assert!(!result.degraded);
    }

    #[tokio::test]
    async fn unproductive_email_never_gets_suggestions() {
        // Only one scripted response: the suggestion call must not happen.
        let llm = ScriptedProvider::new(vec![Some(CLASSIFY_UNPRODUCTIVE)]);
        let pipeline = EmailPipeline::new(llm, &settings());

        let result = pipeline
            .classify("Feliz aniversário! Tudo de bom.")
            .await
            .unwrap();

        assert_eq!(result.classification, Label::Unproductive);
        assert!(result.suggestions.is_empty());
        assert!(!result.degraded);
    }

    #[tokio::test]
    async fn total_outage_still_returns_heuristic_result() {
        let llm = ScriptedProvider::new(vec![None, None]);
        let pipeline = EmailPipeline::new(llm, &settings());

        let result = pipeline
            .classify("Preciso do relatório até amanhã às 14h, é urgente.")
            .await
            .unwrap();

        assert_eq!(result.classification, Label::Productive);
        assert!(result.confidence <= 0.6);
        assert!(result.suggestions.is_empty());
        assert!(result.degraded);
    }

    #[tokio::test]
    async fn suggestion_failure_degrades_but_keeps_classification() {
        let llm = ScriptedProvider::new(vec![Some(CLASSIFY_PRODUCTIVE), None]);
        let pipeline = EmailPipeline::new(llm, &settings());

        let result = pipeline
            .classify("Pode enviar o orçamento atualizado?")
            .await
            .unwrap();

        assert_eq!(result.classification, Label::Productive);
        assert!(result.suggestions.is_empty());
        assert!(result.degraded);
    }

    #[tokio::test]
    async fn short_text_rejected_before_any_model_call() {
        let llm = ScriptedProvider::new(vec![]);
        let pipeline = EmailPipeline::new(llm, &settings());

        let err = pipeline.classify("oi").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Extract(ExtractError::ContentTooShort { .. })
        ));
    }

    #[tokio::test]
    async fn oversized_file_rejected_before_any_model_call() {
        let llm = ScriptedProvider::new(vec![]);
        let pipeline = EmailPipeline::new(llm, &settings());

        let big = vec![b'a'; 6 * 1024 * 1024];
        let err = pipeline.classify_file(&big, "mail.txt").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Extract(ExtractError::FileTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn classify_file_runs_full_pipeline() {
        let llm = ScriptedProvider::new(vec![Some(CLASSIFY_PRODUCTIVE), Some(SUGGESTIONS_OK)]);
        let pipeline = EmailPipeline::new(llm, &settings());

        let raw = concat!(
            "From: alice@example.com\r\n",
            "Subject: Relatório\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "\r\n",
            "Preciso do relatório até amanhã às 14h.\r\n",
        );
        let result = pipeline
            .classify_file(raw.as_bytes(), "pedido.eml")
            .await
            .unwrap();

        assert_eq!(result.classification, Label::Productive);
        assert_eq!(result.suggestions.len(), 2);
    }

    #[tokio::test]
    async fn heuristic_path_is_stable_across_runs() {
        // Same input through the all-outage path twice yields the same label.
        let text = "Solicito atualização do orçamento, por favor.";

        let first = EmailPipeline::new(ScriptedProvider::new(vec![None, None]), &settings())
            .classify(text)
            .await
            .unwrap();
        let second = EmailPipeline::new(ScriptedProvider::new(vec![None, None]), &settings())
            .classify(text)
            .await
            .unwrap();

        assert_eq!(first.classification, second.classification);
        assert_eq!(first.confidence, second.confidence);
    }
}
