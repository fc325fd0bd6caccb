//! Bridges a concrete `LlmBackend` to `docqa_core::LanguageModel`, so the
//! orchestrator only ever depends on the core trait.

use std::sync::Arc;

use async_trait::async_trait;

use docqa_core::error::Result;
use docqa_core::traits::{ChatRequest, ChatResponse, LanguageModel};

use crate::backend::{retry_with_backoff, LlmBackend};

pub struct LanguageModelAdapter {
    backend: Arc<dyn LlmBackend>,
}

impl LanguageModelAdapter {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl LanguageModel for LanguageModelAdapter {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let result = retry_with_backoff(|| {
            self.backend
                .generate(&request.messages, &request.model, request.temperature, request.max_tokens)
        })
        .await
        .map_err(docqa_core::Error::from)?;

        Ok(ChatResponse {
            text: result.text,
            input_tokens: result.input_tokens,
            output_tokens: result.output_tokens,
        })
    }

    fn provider_name(&self) -> &str {
        self.backend.provider_name()
    }
}
