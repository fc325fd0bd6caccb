//! Centralized constants: service endpoints, timeouts, and retrieval
//! tuning defaults. Business/domain data has no place here; this module
//! only holds generic infrastructure and algorithm parameters (§6).

/// Service endpoints (env var overridable, with fallback defaults).
pub mod endpoints {
    use once_cell::sync::Lazy;

    pub static OLLAMA_DEFAULT: Lazy<String> = Lazy::new(|| {
        std::env::var("OLLAMA_URL").unwrap_or_else(|_| "http://localhost:11434".to_string())
    });

    pub static QDRANT_DEFAULT: Lazy<String> = Lazy::new(|| {
        std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://127.0.0.1:6333".to_string())
    });

    pub static OPENAI_DEFAULT: Lazy<String> = Lazy::new(|| {
        std::env::var("OPENAI_API_BASE").unwrap_or_else(|_| "https://api.openai.com/v1".to_string())
    });

    pub static ANTHROPIC_DEFAULT: Lazy<String> = Lazy::new(|| {
        std::env::var("ANTHROPIC_API_BASE")
            .unwrap_or_else(|_| "https://api.anthropic.com".to_string())
    });

    pub static EMBEDDING_SERVICE_DEFAULT: Lazy<String> = Lazy::new(|| {
        std::env::var("EMBEDDING_SERVICE_URL").unwrap_or_else(|_| "http://127.0.0.1:8081".to_string())
    });

    pub static RERANKER_SERVICE_DEFAULT: Lazy<String> = Lazy::new(|| {
        std::env::var("RERANKER_SERVICE_URL").unwrap_or_else(|_| "http://127.0.0.1:8082".to_string())
    });
}

/// Per-external-call deadlines (§5).
pub mod timeouts {
    pub const EMBEDDING_SECS: u64 = 30;
    pub const VECTOR_SEARCH_SECS: u64 = 10;
    pub const RERANKER_SECS: u64 = 30;
    pub const LLM_GRADE_SECS: u64 = 120;
    pub const LLM_GENERATE_SECS: u64 = 180;
    pub const LLM_REWRITE_SECS: u64 = 60;
    pub const REQUEST_DEADLINE_SECS: u64 = 240;

    /// Backoff applied to retried external calls in C4/C5/C6/C7/C8 (§4.1).
    pub const RETRY_BACKOFF_BASE_MS: u64 = 250;
    pub const RETRY_BACKOFF_CAP_MS: u64 = 4_000;
    pub const RETRY_ATTEMPTS: u32 = 2;
}

/// Retrieval and reranking defaults (§6 Configuration).
pub mod retrieval {
    pub const DEFAULT_TOP_K: usize = 10;
    pub const DEFAULT_PREFETCH_LIMIT: usize = 20;
    pub const DEFAULT_RERANK_TOP_K: usize = 5;
    pub const DEFAULT_RRF_K: f32 = 60.0;
    pub const DEFAULT_DENSE_WEIGHT: f32 = 0.65;
    pub const DEFAULT_MIN_SCORE: f32 = 0.35;
    pub const LANGUAGE_BOOST_FACTOR: f32 = 1.10;

    /// Minimum token budget to include a truncated document prefix (§4.5).
    pub const MIN_DOC_TOKENS: usize = 128;
}

/// Grading, retry, and guardrail defaults (§6, §4.4, §3 invariants).
pub mod pipeline {
    pub const MAX_RETRIES: u32 = 3;
    pub const MAX_QUERY_LENGTH: usize = 2000;
    pub const GRADE_CONFIDENCE_THRESHOLD: f32 = 0.5;
    pub const GROUNDING_MIN_OVERLAP: f32 = 0.30;
    pub const GROUNDING_SCALED_CONFIDENCE: f32 = 0.70;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieval_weights_are_valid_fractions() {
        assert!((0.0..=1.0).contains(&retrieval::DEFAULT_DENSE_WEIGHT));
        assert!((0.0..=1.0).contains(&retrieval::DEFAULT_MIN_SCORE));
    }

    #[test]
    fn timeouts_are_positive() {
        assert!(timeouts::EMBEDDING_SECS > 0);
        assert!(timeouts::REQUEST_DEADLINE_SECS > timeouts::LLM_GENERATE_SECS);
    }
}
