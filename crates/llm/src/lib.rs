//! LLM provider abstraction (§6): a single `chat(messages, model, temperature,
//! max_tokens)` capability, backed by Claude-family, OpenAI-family, or local
//! Ollama-family providers selected via `LLM_PROVIDER`.

pub mod adapter;
pub mod backend;
pub mod claude;
pub mod factory;
pub mod ollama;
pub mod openai;
pub mod prompt;

pub use adapter::LanguageModelAdapter;
pub use backend::{retry_with_backoff, GenerationResult, LlmBackend};
pub use claude::ClaudeBackend;
pub use factory::build_language_model;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;
pub use prompt::{PromptFactory, QueryClass};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("generation error: {0}")]
    Generation(String),

    #[error("api error: {0}")]
    Api(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timeout")]
    Timeout,

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for docqa_core::Error {
    fn from(err: LlmError) -> Self {
        docqa_core::Error::Llm(err.to_string())
    }
}
