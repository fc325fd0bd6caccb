//! Per-provider backend seam and the shared retry/backoff helper used by
//! every external call in C4/C5/C6/C7/C8 (§4.1, §6).

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use docqa_config::constants::timeouts;
use docqa_core::traits::ChatMessage;

use crate::LlmError;

#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// A concrete provider backend. `docqa-orchestrator` never talks to this
/// directly; it consumes `docqa_core::LanguageModel` via
/// `LanguageModelAdapter`, which wraps one of these.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        model: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<GenerationResult, LlmError>;

    fn provider_name(&self) -> &str;
}

/// Jittered exponential backoff retry, base 250ms / cap 4s, 2 retries after
/// the first attempt (§4.1 failure semantics).
pub async fn retry_with_backoff<F, Fut, T>(mut attempt: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let base = Duration::from_millis(timeouts::RETRY_BACKOFF_BASE_MS);
    let cap = Duration::from_millis(timeouts::RETRY_BACKOFF_CAP_MS);
    let mut last_err = None;

    for retry in 0..=timeouts::RETRY_ATTEMPTS {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                last_err = Some(err);
                if retry == timeouts::RETRY_ATTEMPTS {
                    break;
                }
                let backoff = (base * 2u32.pow(retry)).min(cap);
                let jitter_ms = (rand::random::<f32>() * backoff.as_millis() as f32 * 0.25) as u64;
                tokio::time::sleep(backoff + Duration::from_millis(jitter_ms)).await;
            },
        }
    }

    Err(last_err.unwrap_or(LlmError::Generation("retry loop produced no result".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retry_eventually_succeeds() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, LlmError> = retry_with_backoff(|| async {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(LlmError::Network("boom".to_string()))
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn retry_exhausts_after_configured_attempts() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, LlmError> = retry_with_backoff(|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::Network("always fails".to_string()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), timeouts::RETRY_ATTEMPTS + 1);
    }
}
