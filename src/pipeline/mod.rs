//! Email classification pipeline.
//!
//! Flow: extraction (file inputs) → classification → conditional
//! suggestion generation. [`EmailPipeline`] is the only entry point the
//! surrounding HTTP layer calls.

pub mod classifier;
pub mod heuristics;
pub mod processor;
pub mod suggestions;
pub mod types;

pub use processor::EmailPipeline;
pub use types::{
    ClassificationResult, ClassificationSource, Label, PipelineResult, Suggestion, Tone,
};
