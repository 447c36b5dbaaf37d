//! mailtriage — AI-mediated email classification and reply drafting core.
//!
//! Classifies an email as productive or unproductive and, when productive,
//! proposes reply drafts in a fixed set of tones. The LLM backend is
//! swappable between a local inference server and a hosted API; model
//! output is parsed defensively with a deterministic heuristic fallback,
//! so every validated request returns a result.

pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod pipeline;
