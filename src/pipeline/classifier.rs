//! Email classifier — prompt construction, structured-response parsing,
//! and the heuristic fallback chain.
//!
//! Model output is untrusted external text. Parsing is a tagged decision
//! chain, not exception handling: strict JSON parse, then loose pattern
//! extraction, then the deterministic scorer. Every stage hands an explicit
//! "could not parse" to the next, so `classify` always returns a result.

use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::llm::{CompletionRequest, LlmProvider, complete_with_retry};
use crate::pipeline::heuristics::HeuristicClassifier;
use crate::pipeline::types::{ClassificationResult, ClassificationSource, Label};

/// Temperature for classification — determinism over creativity.
const CLASSIFY_TEMPERATURE: f32 = 0.1;

/// Prompt embeds at most this many characters of the email.
const MAX_EMAIL_CHARS: usize = 4000;

pub struct Classifier {
    llm: Arc<dyn LlmProvider>,
    heuristics: HeuristicClassifier,
    max_tokens: u32,
    max_retries: u32,
}

impl Classifier {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        heuristics: HeuristicClassifier,
        max_tokens: u32,
        max_retries: u32,
    ) -> Self {
        Self {
            llm,
            heuristics,
            max_tokens,
            max_retries,
        }
    }

    /// Classify an email. Infallible: model outage or unparseable output
    /// degrades to the heuristic scorer instead of erroring.
    pub async fn classify(&self, text: &str) -> ClassificationResult {
        let request = CompletionRequest::new(build_system_prompt(), build_user_prompt(text))
            .with_max_tokens(self.max_tokens)
            .with_temperature(CLASSIFY_TEMPERATURE);

        let raw = match complete_with_retry(self.llm.as_ref(), request, self.max_retries).await {
            Ok(response) => response.content,
            Err(e) => {
                warn!(error = %e, "Model unavailable for classification, using heuristic scorer");
                return self.heuristics.score(text);
            }
        };

        match parse_classification(&raw) {
            Some(parsed) => {
                let (confidence, source) = match parsed.confidence {
                    Some(c) => (c.clamp(0.0, 1.0), ClassificationSource::Model),
                    // Label parsed cleanly but the confidence didn't —
                    // keep the label, take the heuristic confidence.
                    None => (
                        self.heuristics.score(text).confidence,
                        ClassificationSource::ModelLabel,
                    ),
                };
                debug!(
                    label = parsed.label.as_str(),
                    confidence,
                    source = ?source,
                    "Classified email"
                );
                ClassificationResult {
                    label: parsed.label,
                    confidence,
                    reasoning: parsed
                        .reasoning
                        .unwrap_or_else(|| "Classified by model".to_string()),
                    source,
                }
            }
            None => {
                warn!(
                    raw_response = %raw.chars().take(200).collect::<String>(),
                    "Unparseable classification response, using heuristic scorer"
                );
                self.heuristics.score(text)
            }
        }
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_system_prompt() -> String {
    "You are a corporate email triage classifier.\n\n\
     Classify each email as:\n\
     - \"productive\": requires an action or response (support requests, \
     open case updates, questions, meeting or quote requests, legitimate \
     business communication).\n\
     - \"unproductive\": requires no action (congratulations, thanks, \
     season's greetings, spam, unsolicited marketing, automated noise).\n\n\
     Respond with ONLY a JSON object:\n\
     {\"classification\": \"productive\" or \"unproductive\", \
     \"confidence\": number between 0.0 and 1.0, \
     \"reasoning\": \"brief explanation, two sentences at most\"}\n\n\
     No text before or after the JSON."
        .to_string()
}

fn build_user_prompt(text: &str) -> String {
    let preview: String = text.chars().take(MAX_EMAIL_CHARS).collect();
    format!(
        "Analyze and classify this email:\n---\n{}\n---\n\
         Classify as productive or unproductive and return the JSON.",
        preview.trim()
    )
}

// ── Response parsing ────────────────────────────────────────────────

/// Outcome of the strict/loose parse chain. `confidence: None` means the
/// label was usable but the confidence was absent, non-numeric, or out of
/// range.
#[derive(Debug)]
struct ParsedClassification {
    label: Label,
    confidence: Option<f32>,
    reasoning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    classification: String,
    #[serde(default)]
    confidence: serde_json::Value,
    #[serde(default)]
    reasoning: String,
}

/// Parse model output: strict JSON first, loose pattern extraction second.
fn parse_classification(raw: &str) -> Option<ParsedClassification> {
    parse_strict(raw).or_else(|| parse_loose(raw))
}

fn parse_strict(raw: &str) -> Option<ParsedClassification> {
    let json_str = extract_json_object(raw);
    let parsed: RawClassification = serde_json::from_str(&json_str).ok()?;
    let label = Label::parse(&parsed.classification)?;

    let confidence = parsed
        .confidence
        .as_f64()
        .map(|c| c as f32)
        .filter(|c| (0.0..=1.0).contains(c));

    let reasoning = if parsed.reasoning.trim().is_empty() {
        None
    } else {
        Some(parsed.reasoning)
    };

    Some(ParsedClassification {
        label,
        confidence,
        reasoning,
    })
}

/// Loose extraction: a label keyword plus a numeric confidence anywhere
/// in the text. Used when the model ignores the JSON instruction.
fn parse_loose(raw: &str) -> Option<ParsedClassification> {
    let unproductive = Regex::new(r"(?i)\b(improdutivo|unproductive)\b").expect("static pattern");
    let productive = Regex::new(r"(?i)\b(produtivo|productive)\b").expect("static pattern");

    let label = if unproductive.is_match(raw) {
        Label::Unproductive
    } else if productive.is_match(raw) {
        Label::Productive
    } else {
        return None;
    };

    let number = Regex::new(r"(\d+[.,]\d+|\d+\s*%)").expect("static pattern");
    let confidence = number
        .captures(raw)
        .and_then(|c| parse_confidence_token(&c[1]));

    Some(ParsedClassification {
        label,
        confidence,
        reasoning: None,
    })
}

/// Accept "0.85", "0,85", or "85 %"-style confidence tokens.
fn parse_confidence_token(token: &str) -> Option<f32> {
    if let Some(percent) = token.strip_suffix('%') {
        let value: f32 = percent.trim().parse().ok()?;
        return ((0.0..=100.0).contains(&value)).then_some(value / 100.0);
    }
    let value: f32 = token.replace(',', ".").parse().ok()?;
    if (0.0..=1.0).contains(&value) {
        Some(value)
    } else if (1.0..=100.0).contains(&value) {
        Some(value / 100.0)
    } else {
        None
    }
}

/// Extract a JSON object from model output (handles markdown wrapping).
pub(crate) fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}
