//! Shared types for the classification pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Classification ──────────────────────────────────────────────────

/// Classification label for an email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Requires an action or response (requests, task updates, questions).
    Productive,
    /// No action needed (greetings, thanks, noise).
    Unproductive,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Productive => "productive",
            Self::Unproductive => "unproductive",
        }
    }

    /// Parse a label from model output, accepting Portuguese spellings.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "productive" | "produtivo" => Some(Self::Productive),
            "unproductive" | "improdutivo" => Some(Self::Unproductive),
            _ => None,
        }
    }
}

/// Where a classification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationSource {
    /// Fully parsed from model output.
    Model,
    /// Label from the model, confidence from the heuristic scorer.
    ModelLabel,
    /// Deterministic keyword scorer — model unavailable or unparseable.
    Heuristic,
}

/// Result of classifying one email. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub label: Label,
    /// Always within [0.0, 1.0].
    pub confidence: f32,
    pub reasoning: String,
    pub source: ClassificationSource,
}

// ── Suggestions ─────────────────────────────────────────────────────

/// Tone of a generated reply draft. The set is closed: model output with
/// any other tone is dropped during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Formal,
    Cordial,
    Casual,
    Technical,
}

impl Tone {
    pub const ALL: [Tone; 4] = [Tone::Formal, Tone::Cordial, Tone::Casual, Tone::Technical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Formal => "formal",
            Self::Cordial => "cordial",
            Self::Casual => "casual",
            Self::Technical => "technical",
        }
    }

    /// Normalize a tone string from model output, accepting the Portuguese
    /// synonyms the models tend to produce. Unknown tones map to `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "formal" | "profissional" | "professional" => Some(Self::Formal),
            "cordial" | "amigável" | "amigavel" | "friendly" => Some(Self::Cordial),
            "casual" | "informal" => Some(Self::Casual),
            "technical" | "técnico" | "tecnico" => Some(Self::Technical),
            _ => None,
        }
    }
}

/// A single reply draft proposed for a productive email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    /// Short label describing the draft.
    pub title: String,
    /// Full draft reply body.
    pub content: String,
    pub tone: Tone,
}

// ── Pipeline result ─────────────────────────────────────────────────

/// The sole artifact returned to the caller. Request-scoped: created at
/// request start, discarded after the response is sent.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub classification: Label,
    pub confidence: f32,
    pub reasoning: String,
    /// Always empty for unproductive emails.
    pub suggestions: Vec<Suggestion>,
    /// True when the model path degraded: the classification fell back to
    /// the heuristic scorer, or suggestion generation failed for a
    /// productive email. Not part of the wire shape.
    #[serde(skip)]
    pub degraded: bool,
    #[serde(skip)]
    pub processed_at: DateTime<Utc>,
}
