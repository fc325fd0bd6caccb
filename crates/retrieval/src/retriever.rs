//! Retrieval Adapter (C4, §4.2): dense+lexical hybrid search fused by
//! Reciprocal Rank Fusion, with a language boost re-sort.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use docqa_core::document::metadata_keys;
use docqa_core::traits::{RetrievalOutcome, RetrieveOptions, Retriever};
use docqa_core::{Document, Error, Result};

use crate::embeddings::EmbeddingClient;
use crate::sparse_search::SparseIndex;
use crate::vector_store::VectorStore;
use crate::RetrievalError;

#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    pub rrf_k: f32,
    pub language_boost_factor: f32,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            rrf_k: docqa_config::constants::retrieval::DEFAULT_RRF_K,
            language_boost_factor: docqa_config::constants::retrieval::LANGUAGE_BOOST_FACTOR,
        }
    }
}

pub struct HybridRetriever {
    config: RetrieverConfig,
    embeddings: Arc<EmbeddingClient>,
    vector_store: Arc<VectorStore>,
    sparse_index: Option<Arc<SparseIndex>>,
}

impl HybridRetriever {
    pub fn new(
        config: RetrieverConfig,
        embeddings: Arc<EmbeddingClient>,
        vector_store: Arc<VectorStore>,
        sparse_index: Option<Arc<SparseIndex>>,
    ) -> Self {
        Self { config, embeddings, vector_store, sparse_index }
    }

    fn fuse(&self, dense: Vec<crate::vector_store::VectorSearchResult>, sparse: Vec<crate::sparse_search::SparseResult>) -> Vec<(String, f32, String, HashMap<String, String>)> {
        fuse_rankings(self.config.rrf_k, dense, sparse)
    }

    fn apply_language_boost(&self, documents: Vec<Document>, detected_language: Option<&str>) -> Vec<Document> {
        apply_language_boost(self.config.language_boost_factor, documents, detected_language)
    }
}

/// Client-side Reciprocal Rank Fusion (k=60 by default) over the dense and
/// sparse rankings, since lexical search runs against a local Tantivy index
/// rather than an in-database text field (not a vector-backend hybrid mode).
fn fuse_rankings(
    rrf_k: f32,
    dense: Vec<crate::vector_store::VectorSearchResult>,
    sparse: Vec<crate::sparse_search::SparseResult>,
) -> Vec<(String, f32, String, HashMap<String, String>)> {
    let mut scores: HashMap<String, f32> = HashMap::new();
    let mut payload: HashMap<String, (String, HashMap<String, String>)> = HashMap::new();

    for (rank, hit) in dense.into_iter().enumerate() {
        *scores.entry(hit.id.clone()).or_insert(0.0) += 1.0 / (rrf_k + rank as f32 + 1.0);
        payload.entry(hit.id).or_insert((hit.content, hit.metadata));
    }

    for (rank, hit) in sparse.into_iter().enumerate() {
        *scores.entry(hit.id.clone()).or_insert(0.0) += 1.0 / (rrf_k + rank as f32 + 1.0);
        payload.entry(hit.id).or_insert((hit.content, hit.metadata));
    }

    let mut fused: Vec<(String, f32, String, HashMap<String, String>)> = scores
        .into_iter()
        .filter_map(|(id, score)| payload.remove(&id).map(|(content, metadata)| (id, score, content, metadata)))
        .collect();

    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    fused
}

/// Multiplies scores of documents whose `metadata.language` matches the
/// detected query language by `language_boost_factor`, then re-sorts
/// stably (§4.2).
fn apply_language_boost(factor: f32, mut documents: Vec<Document>, detected_language: Option<&str>) -> Vec<Document> {
    if let Some(language) = detected_language {
        for doc in &mut documents {
            if doc.language() == Some(language) {
                if let Some(score) = doc.retrieval_score {
                    doc.retrieval_score = Some(score * factor);
                }
            }
        }
    }
    documents.sort_by(|a, b| {
        b.retrieval_score
            .partial_cmp(&a.retrieval_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    documents
}

#[async_trait]
impl Retriever for HybridRetriever {
    async fn retrieve(&self, query: &str, options: &RetrieveOptions) -> Result<RetrievalOutcome> {
        let embedding = self
            .embeddings
            .embed(query)
            .await
            .map_err(|e| Error::from(RetrievalError::Embedding(e.to_string())))?;

        let dense = self
            .vector_store
            .search(&embedding, options.prefetch_limit, &options.filters)
            .await
            .map_err(Error::from)?;

        let (sparse, warning) = match &self.sparse_index {
            Some(index) => match index.search(query, Some(options.prefetch_limit)) {
                Ok(results) => (results, None),
                Err(e) => {
                    tracing::warn!(error = %e, "lexical search failed, falling back to dense-only");
                    (Vec::new(), Some(format!("lexical_search_failed: {e}")))
                },
            },
            None => {
                tracing::warn!("lexical index absent, falling back to dense-only");
                (Vec::new(), Some("lexical_index_absent".to_string()))
            },
        };

        let fused = self.fuse(dense, sparse);

        let mut documents: Vec<Document> = fused
            .into_iter()
            .take(options.top_k)
            .map(|(id, score, content, mut metadata)| {
                metadata.entry(metadata_keys::DOCUMENT_ID.to_string()).or_insert(id);
                let mut doc = Document::new(content, metadata);
                doc.retrieval_score = Some(score);
                doc
            })
            .collect();

        documents = self.apply_language_boost(documents, options.detected_language.as_deref());

        Ok(RetrievalOutcome { documents, warning })
    }

    async fn health(&self) -> docqa_core::traits::RetrieverHealth {
        let vector_backend = self.vector_store.healthy().await;
        let collection = self.vector_store.collection_info().await.ok();
        docqa_core::traits::RetrieverHealth {
            vector_backend,
            collection_name: collection.as_ref().map(|c| c.name.clone()).unwrap_or_default(),
            collection_points: collection.map(|c| c.points_count).unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse_search::SparseResult;
    use crate::vector_store::VectorSearchResult;

    #[test]
    fn fusion_combines_overlapping_ranks() {
        let dense = vec![VectorSearchResult { id: "a".into(), score: 0.9, content: "A".into(), metadata: HashMap::new() }];
        let sparse = vec![SparseResult { id: "a".into(), score: 2.0, content: "A".into(), metadata: HashMap::new() }];
        let fused = fuse_rankings(60.0, dense, sparse);
        assert_eq!(fused.len(), 1);
        assert!(fused[0].1 > 1.0 / 61.0);
    }

    #[test]
    fn language_boost_reorders_matching_document_upward() {
        let mut low = Document::new("x".to_string(), HashMap::new());
        low.retrieval_score = Some(0.5);
        let mut high_lang = Document::new("y".to_string(), HashMap::new());
        high_lang.metadata.insert(metadata_keys::LANGUAGE.to_string(), "ru".to_string());
        high_lang.retrieval_score = Some(0.46);

        let boosted = apply_language_boost(1.10, vec![low, high_lang], Some("ru"));
        assert_eq!(boosted[0].language(), Some("ru"));
    }
}
