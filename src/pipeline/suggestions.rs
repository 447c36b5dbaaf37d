//! Reply suggestion generator for productive emails.
//!
//! One model call requests a draft per tone in the fixed set. There is no
//! non-AI substitute for free-text drafting, so failures here degrade to an
//! empty list — the pipeline still returns the classification.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::llm::{CompletionRequest, LlmProvider, complete_with_retry};
use crate::pipeline::classifier::extract_json_object;
use crate::pipeline::types::{Suggestion, Tone};

/// Prompt embeds at most this many characters of the email.
const MAX_EMAIL_CHARS: usize = 4000;

pub struct SuggestionGenerator {
    llm: Arc<dyn LlmProvider>,
    max_tokens: u32,
    temperature: f32,
    max_retries: u32,
}

impl SuggestionGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, max_tokens: u32, temperature: f32, max_retries: u32) -> Self {
        Self {
            llm,
            max_tokens,
            temperature,
            max_retries,
        }
    }

    /// Generate reply drafts for a productive email.
    ///
    /// Infallible: gateway failure or unusable output yields an empty list.
    /// A parse that succeeds but yields zero valid suggestions is the same
    /// partial failure, logged for observability.
    pub async fn generate(&self, text: &str) -> Vec<Suggestion> {
        let request = CompletionRequest::new(build_system_prompt(), build_user_prompt(text))
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature);

        let raw = match complete_with_retry(self.llm.as_ref(), request, self.max_retries).await {
            Ok(response) => response.content,
            Err(e) => {
                warn!(error = %e, "Model unavailable for suggestions, returning none");
                return Vec::new();
            }
        };

        let suggestions = parse_suggestions(&raw);
        if suggestions.is_empty() {
            warn!(
                raw_response = %raw.chars().take(200).collect::<String>(),
                "Suggestion response yielded no valid drafts"
            );
        } else {
            debug!(count = suggestions.len(), "Generated reply suggestions");
        }
        suggestions
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_system_prompt() -> String {
    let tones = Tone::ALL
        .iter()
        .map(|t| format!("\"{}\"", t.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You are an assistant that drafts professional email replies.\n\
         Generate exactly {} reply drafts for the email provided, one per \
         tone: {tones}. Each draft must address the sender's actual request \
         with clarity and professionalism.\n\n\
         Respond with ONLY a JSON object:\n\
         {{\"suggestions\": [{{\"title\": \"short label\", \
         \"content\": \"full draft reply\", \"tone\": one of {tones}}}]}}\n\n\
         No text before or after the JSON.",
        Tone::ALL.len()
    )
}

fn build_user_prompt(text: &str) -> String {
    let preview: String = text.chars().take(MAX_EMAIL_CHARS).collect();
    format!(
        "Draft reply suggestions for this email:\n---\n{}\n---\n\
         Return the suggestions as JSON.",
        preview.trim()
    )
}

// ── Response parsing ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawSuggestions {
    #[serde(default)]
    suggestions: Vec<RawSuggestion>,
}

#[derive(Debug, Deserialize)]
struct RawSuggestion {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    tone: String,
}

/// Parse suggestion records from model output.
///
/// Strict first: a JSON object with a `suggestions` array. Loose second: a
/// bare JSON array. Records with an unknown tone or empty content are
/// dropped rather than failing the batch.
fn parse_suggestions(raw: &str) -> Vec<Suggestion> {
    let records = parse_strict(raw).or_else(|| parse_loose(raw)).unwrap_or_default();

    records
        .into_iter()
        .filter_map(|r| {
            let tone = match Tone::parse(&r.tone) {
                Some(tone) => tone,
                None => {
                    warn!(tone = %r.tone, "Dropping suggestion with unknown tone");
                    return None;
                }
            };
            if r.content.trim().is_empty() {
                return None;
            }
            let title = if r.title.trim().is_empty() {
                format!("{} reply", tone.as_str())
            } else {
                r.title
            };
            Some(Suggestion {
                title,
                content: r.content,
                tone,
            })
        })
        .collect()
}

fn parse_strict(raw: &str) -> Option<Vec<RawSuggestion>> {
    let json_str = extract_json_object(raw);
    let parsed: RawSuggestions = serde_json::from_str(&json_str).ok()?;
    (!parsed.suggestions.is_empty()).then_some(parsed.suggestions)
}

/// Loose extraction: the model returned a bare array instead of the
/// requested object.
fn parse_loose(raw: &str) -> Option<Vec<RawSuggestion>> {
    let trimmed = raw.trim();
    let (start, end) = (trimmed.find('['), trimmed.rfind(']'));
    if let (Some(start), Some(end)) = (start, end)
        && end > start
    {
        return serde_json::from_str(&trimmed[start..=end]).ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::LlmError;
    use crate::llm::CompletionResponse;

    #[test]
    fn parses_full_record_set() {
        let raw = r#"{"suggestions": [
            {"title": "Confirm deadline", "content": "I'll send it by 2pm.", "tone": "formal"},
            {"title": "Quick ack", "content": "On it!", "tone": "casual"}
        ]}"#;
        let suggestions = parse_suggestions(raw);
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].tone, Tone::Formal);
        assert_eq!(suggestions[1].tone, Tone::Casual);
    }

    #[test]
    fn unknown_tones_are_dropped() {
        let raw = r#"{"suggestions": [
            {"title": "a", "content": "body a", "tone": "sarcastic"},
            {"title": "b", "content": "body b", "tone": "cordial"}
        ]}"#;
        let suggestions = parse_suggestions(raw);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].tone, Tone::Cordial);
    }

    #[test]
    fn portuguese_tones_normalized() {
        let raw = r#"{"suggestions": [
            {"title": "t", "content": "corpo", "tone": "técnico"},
            {"title": "a", "content": "corpo", "tone": "amigável"}
        ]}"#;
        let suggestions = parse_suggestions(raw);
        assert_eq!(suggestions[0].tone, Tone::Technical);
        assert_eq!(suggestions[1].tone, Tone::Cordial);
    }

    #[test]
    fn empty_content_dropped_and_title_defaulted() {
        let raw = r#"{"suggestions": [
            {"title": "", "content": "A real draft.", "tone": "formal"},
            {"title": "x", "content": "   ", "tone": "casual"}
        ]}"#;
        let suggestions = parse_suggestions(raw);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].title, "formal reply");
    }

    #[test]
    fn markdown_fenced_object_accepted() {
        let raw = "```json\n{\"suggestions\": [{\"title\": \"t\", \"content\": \"c\", \"tone\": \"formal\"}]}\n```";
        assert_eq!(parse_suggestions(raw).len(), 1);
    }

    #[test]
    fn bare_array_accepted_via_loose_parse() {
        let raw = r#"[{"title": "t", "content": "c", "tone": "cordial"}]"#;
        let suggestions = parse_suggestions(raw);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].tone, Tone::Cordial);
    }

    #[test]
    fn garbage_yields_empty() {
        assert!(parse_suggestions("no structured data here").is_empty());
        assert!(parse_suggestions("").is_empty());
    }

    #[test]
    fn system_prompt_names_every_tone() {
        let prompt = build_system_prompt();
        for tone in Tone::ALL {
            assert!(prompt.contains(tone.as_str()), "missing {}", tone.as_str());
        }
    }

    // ── Generator with mock provider ────────────────────────────────

    struct MockProvider {
        response: Option<String>,
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
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
            match &self.response {
                Some(content) => Ok(CompletionResponse {
                    content: content.clone(),
                }),
                None => Err(LlmError::Timeout {
                    provider: "mock".into(),
                }),
            }
        }
    }

    fn generator_with(response: Option<&str>) -> SuggestionGenerator {
        SuggestionGenerator::new(
            Arc::new(MockProvider {
                response: response.map(String::from),
            }),
            500,
            0.7,
            0,
        )
    }

    #[tokio::test]
    async fn gateway_failure_returns_empty() {
        let generator = generator_with(None);
        let suggestions = generator.generate("Preciso do relatório.").await;
        assert!(suggestions.is_empty());
    }

    #[tokio::test]
    async fn valid_response_returns_drafts() {
        let generator = generator_with(Some(
            r#"{"suggestions": [
                {"title": "Confirm", "content": "Envio o relatório até as 14h.", "tone": "formal"},
                {"title": "Ack", "content": "Pode deixar!", "tone": "casual"}
            ]}"#,
        ));
        let suggestions = generator.generate("Preciso do relatório até amanhã.").await;
        assert_eq!(suggestions.len(), 2);
        assert!(suggestions.iter().all(|s| Tone::ALL.contains(&s.tone)));
    }
}
