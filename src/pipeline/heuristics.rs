//! Deterministic fallback classifier.
//!
//! A pure keyword/length scorer used when the model is unavailable or its
//! output cannot be parsed. Action, urgency, and request markers raise the
//! productive score; greeting and courtesy markers raise the unproductive
//! score. Confidence is capped below the model-assisted range to signal
//! reduced trust.
//!
//! Marker sets are bilingual (Portuguese + English) because the upstream
//! traffic mixes both.

use regex::Regex;

use crate::pipeline::types::{ClassificationResult, ClassificationSource, Label};

/// Extra productive weight for long messages — short notes are usually
/// courtesy, long ones usually carry a request.
const LONG_TEXT_CHARS: usize = 500;

/// Base confidence with no distinguishing markers at all.
const BASE_CONFIDENCE: f32 = 0.35;

/// Confidence gained per net marker hit.
const CONFIDENCE_PER_HIT: f32 = 0.08;

/// Floor so the heuristic never claims near-zero certainty.
const MIN_CONFIDENCE: f32 = 0.3;

/// Keyword/length scorer for the heuristic fallback path.
pub struct HeuristicClassifier {
    productive_markers: Vec<Regex>,
    unproductive_markers: Vec<Regex>,
    confidence_cap: f32,
}

impl HeuristicClassifier {
    pub fn new(confidence_cap: f32) -> Self {
        let productive_markers = [
            // Urgency
            r"(?i)\b(urgente|urgência|urgent|asap|o quanto antes)\b",
            // Need / request verbs
            r"(?i)\b(preciso|precisamos|necessito|solicito|solicitação|request|need)\b",
            // Deadlines
            r"(?i)\b(prazo|deadline|até (amanhã|hoje|segunda|terça|quarta|quinta|sexta|\d))\b",
            // Courtesy request forms
            r"(?i)\b(por favor|please|poderia|could you|can you)\b",
            // Business actions
            r"(?i)\b(reunião|meeting|agendar|schedule|orçamento|quote|proposta|proposal)\b",
            // Support / problem reports
            r"(?i)\b(problema|erro|issue|error|bug|suporte|support|ajuda|help|falha)\b",
            // Status / deliverables
            r"(?i)\b(relatório|report|atualização|update|status|andamento)\b",
            // Send / confirm actions
            r"(?i)\b(enviar|envie|reenviar|send|confirmar|confirme|confirm|responder|respond)\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static marker pattern"))
        .collect();

        let unproductive_markers = [
            // Congratulations / holidays
            r"(?i)\b(parabéns|feliz|congratulations|congrats|happy)\b",
            // Thanks
            r"(?i)\b(obrigad[oa]|agradeço|agradecemos|grato|thanks|thank you)\b",
            // Season's greetings / well-wishes
            r"(?i)\b(boas festas|natal|ano novo|bom fim de semana|good weekend|merry)\b",
            r"(?i)\btudo de bom\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static marker pattern"))
        .collect();

        Self {
            productive_markers,
            unproductive_markers,
            confidence_cap,
        }
    }

    /// Score a text deterministically. Always returns a valid result.
    pub fn score(&self, text: &str) -> ClassificationResult {
        let mut productive_hits = self
            .productive_markers
            .iter()
            .filter(|r| r.is_match(text))
            .count() as i32;
        let unproductive_hits = self
            .unproductive_markers
            .iter()
            .filter(|r| r.is_match(text))
            .count() as i32;

        if text.contains('?') {
            productive_hits += 1;
        }
        if text.chars().count() > LONG_TEXT_CHARS {
            productive_hits += 1;
        }

        let net = productive_hits - unproductive_hits;
        // Ties lean unproductive: with no action signal there is nothing to act on.
        let label = if net > 0 {
            Label::Productive
        } else {
            Label::Unproductive
        };

        // The floor yields to a cap configured below it, so an aggressive
        // cap narrows the range instead of panicking in clamp.
        let floor = MIN_CONFIDENCE.min(self.confidence_cap);
        let confidence = (BASE_CONFIDENCE + CONFIDENCE_PER_HIT * net.unsigned_abs() as f32)
            .clamp(floor, self.confidence_cap);

        let reasoning = format!(
            "Heuristic classification: {productive_hits} action/request marker(s) vs \
             {unproductive_hits} courtesy marker(s)"
        );

        ClassificationResult {
            label,
            confidence,
            reasoning,
            source: ClassificationSource::Heuristic,
        }
    }
}
