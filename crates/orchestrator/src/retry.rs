//! Generic retry/backoff for the external-service calls C9 owns directly
//! (retrieval, reranking), mirroring `docqa_llm::backend::retry_with_backoff`
//! but not tied to `LlmError`, since C4/C5 fail with `docqa_core::Error`
//! (§4.1: "External-service failures in C4/C5/C6/C7/C8 are retried up to 2
//! times with jittered exponential backoff").

use std::future::Future;
use std::time::Duration;

use docqa_config::constants::timeouts;

pub async fn retry_with_backoff<F, Fut, T, E>(mut attempt: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
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

    Err(last_err.expect("at least one attempt runs"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_success() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff(|| async {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err("transient")
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn gives_up_after_configured_attempts() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff(|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err("always fails")
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), timeouts::RETRY_ATTEMPTS + 1);
    }
}
