//! Wire-level error category (§7).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    GuardrailInput,
    GuardrailOutput,
    RetrievalUnavailable,
    RerankerUnavailable,
    LlmUnavailable,
    Cancelled,
    Internal,
}

impl ErrorCategory {
    /// Whether an adapter should retry on this category before giving up.
    /// Matches §7's propagation policy: guardrail and cancellation outcomes
    /// are never retried, external-service categories are retried upstream
    /// of this point (the category only appears once retries are exhausted).
    pub fn is_terminal_without_retry(&self) -> bool {
        matches!(
            self,
            ErrorCategory::GuardrailInput | ErrorCategory::Cancelled
        )
    }

    /// Snake-case wire/metric label, matching the `#[serde(rename_all)]` form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::GuardrailInput => "guardrail_input",
            ErrorCategory::GuardrailOutput => "guardrail_output",
            ErrorCategory::RetrievalUnavailable => "retrieval_unavailable",
            ErrorCategory::RerankerUnavailable => "reranker_unavailable",
            ErrorCategory::LlmUnavailable => "llm_unavailable",
            ErrorCategory::Cancelled => "cancelled",
            ErrorCategory::Internal => "internal",
        }
    }
}
