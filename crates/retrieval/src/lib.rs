//! Hybrid retrieval: dense vector search (Qdrant) + lexical BM25 search
//! (Tantivy) fused by Reciprocal Rank Fusion, cross-encoder reranking, and
//! the context budgeter that packs graded documents into a model's token
//! window (§4.2 Retrieval Adapter, §4.3 Reranker Adapter, §4.5 Context
//! Budgeter).

pub mod context_budget;
pub mod embeddings;
pub mod reranker;
pub mod retriever;
pub mod sparse_search;
pub mod vector_store;

pub use context_budget::{build_context_metadata, estimate_tokens, model_window, pack_documents, ModelWindow, PackedContext};
pub use embeddings::{EmbeddingClient, EmbeddingConfig};
pub use reranker::{cascaded_fallback, fallback_by_retrieval_score, RerankerClient, RerankerConfig};
pub use retriever::{HybridRetriever, RetrieverConfig};
pub use sparse_search::{SparseConfig, SparseIndex, SparseResult};
pub use vector_store::{CollectionInfo, VectorDistance, VectorSearchResult, VectorStore, VectorStoreConfig};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("vector store error: {0}")]
    VectorStore(String),

    #[error("search error: {0}")]
    Search(String),

    #[error("reranker error: {0}")]
    Reranker(String),

    #[error("index error: {0}")]
    Index(String),

    #[error("connection error: {0}")]
    Connection(String),
}

impl From<RetrievalError> for docqa_core::Error {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::Reranker(msg) => docqa_core::Error::Reranker(msg),
            other => docqa_core::Error::Retrieval(other.to_string()),
        }
    }
}
