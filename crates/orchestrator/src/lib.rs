//! Agent orchestration engine: the staged self-correcting pipeline (C9),
//! its guardrails (C3), language detector (C2), batch grader (C6), query
//! rewriter (C8), generator (C7), and per-thread session store (C10).
//!
//! `docqa-server` is the only consumer: it builds a `PipelineRuntime` at
//! startup from `docqa_config::Settings` and exposes it over HTTP.

pub mod cancellation;
pub mod generator;
pub mod grader;
pub mod guardrails;
pub mod language;
pub mod pipeline;
pub mod retry;
pub mod rewriter;
pub mod session_store;
pub mod telemetry;

pub use cancellation::CancellationToken;
pub use pipeline::{AskOutcome, AskResult, PipelineConfig, PipelineRuntime};
pub use session_store::SessionStore;

use std::sync::Arc;

use docqa_config::Settings;
use docqa_core::traits::{CheckpointBackend, Retriever};
use docqa_core::LanguageModel;
use docqa_retrieval::{
    EmbeddingClient, EmbeddingConfig, HybridRetriever, RerankerClient, RerankerConfig,
    RetrieverConfig, SparseConfig, SparseIndex, VectorDistance, VectorStore, VectorStoreConfig,
};

/// In-memory checkpoint backend used when `persistence.enabled` is `false`
/// (development/test default). Sessions survive only for the lifetime of
/// the process.
#[derive(Default)]
pub struct InMemoryCheckpointBackend {
    threads: parking_lot::Mutex<std::collections::HashMap<String, docqa_core::session::SessionState>>,
}

#[async_trait::async_trait]
impl CheckpointBackend for InMemoryCheckpointBackend {
    async fn load(&self, thread_id: &str) -> docqa_core::Result<Option<docqa_core::session::SessionState>> {
        Ok(self.threads.lock().get(thread_id).cloned())
    }

    async fn save(&self, thread_id: &str, state: &docqa_core::session::SessionState) -> docqa_core::Result<()> {
        self.threads.lock().insert(thread_id.to_string(), state.clone());
        Ok(())
    }

    async fn list(&self, prefix: Option<&str>) -> docqa_core::Result<Vec<String>> {
        Ok(self
            .threads
            .lock()
            .keys()
            .filter(|id| prefix.map(|p| id.starts_with(p)).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn delete(&self, thread_id: &str) -> docqa_core::Result<()> {
        self.threads.lock().remove(thread_id);
        Ok(())
    }
}

/// Assembles a `PipelineRuntime` from process settings: builds the hybrid
/// retriever (dense + lexical), the reranker client, the LLM adapter, and
/// the session store wired to either ScyllaDB or the in-memory fallback
/// (§6 Configuration, §9 "Global state").
pub async fn build_runtime(settings: &Settings) -> docqa_core::Result<Arc<PipelineRuntime>> {
    let embedding_client = Arc::new(EmbeddingClient::new(
        EmbeddingConfig {
            endpoint: settings.retrieval.embedding_service_endpoint.clone(),
            dim: settings.retrieval.embedding_dim,
        },
        std::time::Duration::from_secs(docqa_config::constants::timeouts::EMBEDDING_SECS),
    ));

    let vector_store = Arc::new(
        VectorStore::new(VectorStoreConfig {
            endpoint: settings.retrieval.qdrant_endpoint.clone(),
            collection: settings.retrieval.qdrant_collection.clone(),
            vector_dim: settings.retrieval.embedding_dim,
            distance: VectorDistance::Cosine,
            api_key: settings.retrieval.qdrant_api_key.clone(),
        })
        .await
        .map_err(docqa_core::Error::from)?,
    );
    vector_store.ensure_collection().await.map_err(docqa_core::Error::from)?;

    let sparse_index: Option<Arc<SparseIndex>> = match SparseIndex::new(SparseConfig {
        index_path: None,
        top_k: settings.retrieval.prefetch_limit,
        stemming: true,
        language: "en".to_string(),
    }) {
        Ok(index) => Some(Arc::new(index)),
        Err(e) => {
            tracing::warn!(error = %e, "lexical index unavailable at startup, falling back to dense-only");
            None
        },
    };

    let retriever: Arc<dyn Retriever> = Arc::new(HybridRetriever::new(
        RetrieverConfig {
            rrf_k: settings.retrieval.rrf_k,
            language_boost_factor: docqa_config::constants::retrieval::LANGUAGE_BOOST_FACTOR,
        },
        embedding_client,
        vector_store,
        sparse_index,
    ));

    let reranker = Arc::new(RerankerClient::new(
        RerankerConfig {
            endpoint: settings.retrieval.reranker_service_endpoint.clone(),
            top_k: settings.retrieval.rerank_top_k,
        },
        std::time::Duration::from_secs(docqa_config::constants::timeouts::RERANKER_SECS),
    ));

    let llm: Arc<dyn LanguageModel> =
        docqa_llm::build_language_model(&settings.llm).map_err(docqa_core::Error::from)?;

    let checkpoint_backend: Arc<dyn CheckpointBackend> = if settings.persistence.enabled {
        Arc::new(docqa_persistence::init(&settings.persistence).await.map_err(docqa_core::Error::from)?)
    } else {
        Arc::new(InMemoryCheckpointBackend::default())
    };

    let sessions = Arc::new(SessionStore::new(checkpoint_backend));

    let config = PipelineConfig {
        model: settings.llm.model.clone(),
        max_query_length: settings.guardrails.max_query_length,
        strict_output_guardrails: settings.guardrails.strict_output_guardrails,
        top_k: settings.retrieval.top_k,
        prefetch_limit: settings.retrieval.prefetch_limit,
        rerank_top_k: settings.retrieval.rerank_top_k,
    };

    Ok(Arc::new(PipelineRuntime::new(retriever, reranker, llm, sessions, config)))
}
