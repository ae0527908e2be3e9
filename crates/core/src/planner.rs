//! Planner trait — the abstraction over the LLM backend.
//!
//! A planner receives the assembled mission prompt and returns the model's
//! raw text reply. Decoding that reply into a `Proposal` is the codec's
//! job, not the planner's — backends stay dumb pipes.
//!
//! Implementations: Gemini HTTP backend, deterministic dummy for tests.

use async_trait::async_trait;

use crate::error::PlannerError;

/// The LLM backend seam.
///
/// The mission loop calls `propose()` without knowing which backend is in
/// use. Both the real HTTP call and the dummy are bounded: a hung request
/// surfaces as `PlannerError::Timeout`, never an indefinite block.
#[async_trait]
pub trait Planner: Send + Sync {
    /// A human-readable name for this backend (e.g., "gemini", "dummy").
    fn name(&self) -> &str;

    /// Send the prompt and return the raw text reply.
    async fn propose(&self, prompt: &str) -> std::result::Result<String, PlannerError>;
}
