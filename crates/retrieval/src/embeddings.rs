//! Embedding service client (§6): `POST /embed {texts:[…]} → {vectors:[[float],…]}`.
//! Embedding generation is delegated to an external service, not run in-process.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::RetrievalError;

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    pub dim: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    vectors: Vec<Vec<f32>>,
}

pub struct EmbeddingClient {
    client: reqwest::Client,
    config: EmbeddingConfig,
}

impl EmbeddingClient {
    pub fn new(config: EmbeddingConfig, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client"),
            config,
        }
    }

    pub fn dim(&self) -> usize {
        self.config.dim
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let mut vectors = self.embed_batch(&[text]).await?;
        vectors.pop().ok_or_else(|| RetrievalError::Embedding("empty response".to_string()))
    }

    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let body = EmbedRequest { texts };

        let response = self
            .client
            .post(format!("{}/embed", self.config.endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RetrievalError::Embedding(format!(
                "embedding service returned {}",
                response.status()
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        if parsed.vectors.len() != texts.len() {
            return Err(RetrievalError::Embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                parsed.vectors.len()
            )));
        }

        Ok(parsed.vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_carries_dimension() {
        let config = EmbeddingConfig { endpoint: "http://localhost:9000".to_string(), dim: 768 };
        let client = EmbeddingClient::new(config, Duration::from_secs(30));
        assert_eq!(client.dim(), 768);
    }
}
