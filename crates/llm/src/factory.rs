//! Selects the provider adapter from `LlmConfig.provider` (§6: `LLM_PROVIDER
//! ∈ {claude, openai, ollama}`).

use std::sync::Arc;
use std::time::Duration;

use docqa_config::LlmConfig;
use docqa_core::LanguageModel;

use crate::adapter::LanguageModelAdapter;
use crate::claude::ClaudeBackend;
use crate::ollama::OllamaBackend;
use crate::openai::OpenAiBackend;
use crate::LlmError;

pub fn build_language_model(config: &LlmConfig) -> Result<Arc<dyn LanguageModel>, LlmError> {
    let timeout = Duration::from_secs(docqa_config::constants::timeouts::LLM_GENERATE_SECS);

    let backend: Arc<dyn crate::backend::LlmBackend> = match config.provider.as_str() {
        "claude" => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| LlmError::Configuration("llm.api_key required for claude".into()))?;
            let endpoint = config
                .endpoint
                .clone()
                .unwrap_or_else(|| "https://api.anthropic.com".to_string());
            Arc::new(ClaudeBackend::new(api_key, endpoint, timeout))
        },
        "openai" => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| LlmError::Configuration("llm.api_key required for openai".into()))?;
            let endpoint = config
                .endpoint
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
            Arc::new(OpenAiBackend::new(api_key, endpoint, timeout))
        },
        "ollama" => {
            let endpoint = config
                .endpoint
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string());
            Arc::new(OllamaBackend::new(endpoint, timeout))
        },
        other => {
            return Err(LlmError::Configuration(format!(
                "unknown llm provider '{}'",
                other
            )))
        },
    };

    Ok(Arc::new(LanguageModelAdapter::new(backend)))
}
