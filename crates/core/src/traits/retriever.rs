//! Retrieval adapter seam (C4), implemented by `docqa-retrieval`.

use async_trait::async_trait;

use crate::document::Document;
use crate::error::Result;
use crate::query::FilterValue;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct RetrieveOptions {
    pub top_k: usize,
    pub prefetch_limit: usize,
    pub filters: HashMap<String, FilterValue>,
    pub detected_language: Option<String>,
}

/// Connectivity snapshot for `GET /health` (§6).
#[derive(Debug, Clone, Default)]
pub struct RetrieverHealth {
    pub vector_backend: bool,
    pub collection_name: String,
    pub collection_points: u64,
}

/// Result of a single retrieval call: the fused documents plus any non-fatal
/// warning (e.g. `lexical_index_absent`) to surface as a streaming event.
#[derive(Debug, Clone, Default)]
pub struct RetrievalOutcome {
    pub documents: Vec<Document>,
    pub warning: Option<String>,
}

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Run the hybrid dense+lexical search and return documents ordered by
    /// `retrieval_score` descending (§4.2). When the lexical index is absent
    /// or fails, falls back to dense-only and reports it via `warning`.
    async fn retrieve(&self, query: &str, options: &RetrieveOptions) -> Result<RetrievalOutcome>;

    /// Probe the dense backend for `GET /health`. Default is "unknown",
    /// overridden by adapters that hold a live connection.
    async fn health(&self) -> RetrieverHealth {
        RetrieverHealth::default()
    }
}
