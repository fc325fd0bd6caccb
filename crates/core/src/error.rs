//! Crate-spanning error type
//!
//! Every other crate in the workspace defines its own `thiserror` error enum
//! and converts into this one at the boundary.

use thiserror::Error;

use crate::ErrorCategory;

#[derive(Error, Debug)]
pub enum Error {
    #[error("retrieval error: {0}")]
    Retrieval(String),

    #[error("reranker error: {0}")]
    Reranker(String),

    #[error("llm error: {0}")]
    Llm(String),

    #[error("guardrail rejected input: {0}")]
    GuardrailInput(String),

    #[error("guardrail rejected output: {0}")]
    GuardrailOutput(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map onto the wire-level error category used by the event stream (§7).
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::GuardrailInput(_) => ErrorCategory::GuardrailInput,
            Error::GuardrailOutput(_) => ErrorCategory::GuardrailOutput,
            Error::Retrieval(_) => ErrorCategory::RetrievalUnavailable,
            Error::Reranker(_) => ErrorCategory::RerankerUnavailable,
            Error::Llm(_) => ErrorCategory::LlmUnavailable,
            Error::Cancelled => ErrorCategory::Cancelled,
            Error::Config(_) | Error::Persistence(_) | Error::Internal(_) => {
                ErrorCategory::Internal
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
