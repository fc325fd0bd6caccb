//! Reranker Adapter (C5, §4.3): cross-encoder reranking service with a
//! retrieval-score fallback on failure.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use docqa_core::Document;

use crate::RetrievalError;

#[derive(Debug, Clone)]
pub struct RerankerConfig {
    pub endpoint: String,
    pub top_k: usize,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    documents: Vec<&'a str>,
    top_k: usize,
}

#[derive(Deserialize)]
struct RerankHit {
    index: usize,
    score: f32,
}

pub struct RerankerClient {
    client: reqwest::Client,
    config: RerankerConfig,
}

impl RerankerClient {
    pub fn new(config: RerankerConfig, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client"),
            config,
        }
    }

    /// Sends `(query, [doc.text,…])`, assigns `rerank_score` and
    /// `combined_score = mean(retrieval_score, rerank_score)`, sorts by
    /// `rerank_score` descending, truncates to `RERANK_TOP_K`. On failure,
    /// the caller falls back to `fallback_by_retrieval_score`.
    pub async fn rerank(&self, query: &str, mut documents: Vec<Document>) -> Result<Vec<Document>, RetrievalError> {
        if documents.is_empty() {
            return Ok(documents);
        }

        let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
        let body = RerankRequest { query, documents: texts, top_k: self.config.top_k };

        let response = self
            .client
            .post(format!("{}/rerank", self.config.endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::Reranker(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RetrievalError::Reranker(format!(
                "reranker returned {}",
                response.status()
            )));
        }

        let hits: Vec<RerankHit> = response
            .json()
            .await
            .map_err(|e| RetrievalError::Reranker(e.to_string()))?;

        for hit in &hits {
            if let Some(doc) = documents.get_mut(hit.index) {
                doc.rerank_score = Some(hit.score);
                doc.combined_score = Some(mean(doc.retrieval_score, Some(hit.score)));
            }
        }

        documents.retain(|d| d.rerank_score.is_some());
        documents.sort_by(|a, b| {
            b.rerank_score
                .partial_cmp(&a.rerank_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        documents.truncate(self.config.top_k);

        Ok(documents)
    }
}

/// Passes through the top `RERANK_TOP_K` by `retrieval_score`, used when the
/// reranker service is unavailable and local lexical scoring (§4.3, §7)
/// turned out to carry no signal either. `rerank_score`/`combined_score` are
/// set from `retrieval_score` so the documents satisfy the §3 invariant that
/// every document reaching C6 has both scores populated.
pub fn fallback_by_retrieval_score(mut documents: Vec<Document>, top_k: usize) -> Vec<Document> {
    documents.sort_by(|a, b| {
        b.retrieval_score
            .partial_cmp(&a.retrieval_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    documents.truncate(top_k);
    for doc in &mut documents {
        doc.rerank_score = doc.retrieval_score;
        doc.combined_score = doc.retrieval_score;
    }
    documents
}

/// Cascaded degradation for reranker failure (§4.3, §9 Open Questions): try
/// cheap local lexical scoring first, and only fall back to raw retrieval
/// order if that scoring carries no signal at all (every document scores
/// zero, e.g. the query and documents share no non-stopword terms).
pub fn cascaded_fallback(documents: Vec<Document>, query: &str, top_k: usize) -> Vec<Document> {
    let mut scored: Vec<Document> = documents
        .into_iter()
        .map(|mut doc| {
            let lexical_score = SimpleScorer::score(query, &doc.text);
            doc.rerank_score = Some(lexical_score);
            doc.combined_score = Some(mean(doc.retrieval_score, Some(lexical_score)));
            doc
        })
        .collect();

    let has_signal = scored.iter().any(|d| d.rerank_score.unwrap_or(0.0) > 0.0);
    if !has_signal {
        return fallback_by_retrieval_score(scored, top_k);
    }

    scored.sort_by(|a, b| {
        b.rerank_score
            .partial_cmp(&a.rerank_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(top_k);
    scored
}

/// Lightweight lexical-overlap scorer used as a cascaded guardrail before the
/// degraded path falls all the way back to raw retrieval order. Not a
/// cross-encoder replacement, just a cheap local approximation.
pub struct SimpleScorer;

impl SimpleScorer {
    const STOPWORDS: &'static [&'static str] = &[
        "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
        "do", "does", "did", "will", "would", "could", "should", "to", "of", "in", "for", "on",
        "with", "at", "by", "from", "as", "into", "and", "or", "but", "if", "then", "that", "this",
        "it", "i", "you", "we", "they",
    ];

    /// Term-frequency/length-weighted overlap score, squashed to `[0, 1]`.
    /// Stopwords are filtered from the query; earlier query terms and
    /// shorter documents are weighted slightly higher.
    pub fn score(query: &str, document: &str) -> f32 {
        let query_lower = query.to_lowercase();
        let doc_lower = document.to_lowercase();
        let stopwords: std::collections::HashSet<&str> = Self::STOPWORDS.iter().copied().collect();

        let query_terms: Vec<&str> = query_lower
            .split_whitespace()
            .filter(|w| w.len() > 1 && !stopwords.contains(w))
            .collect();
        if query_terms.is_empty() {
            return 0.0;
        }

        let doc_words: Vec<&str> = doc_lower.split_whitespace().collect();
        let doc_len = doc_words.len().max(1) as f32;

        let mut total_score = 0.0f32;
        let mut matched_terms = 0usize;
        for (pos, term) in query_terms.iter().enumerate() {
            let tf = doc_words.iter().filter(|w| *w == term).count() as f32;
            if tf > 0.0 {
                matched_terms += 1;
                let tf_score = tf.sqrt();
                let idf_approx = (1.0 + term.len() as f32).ln();
                let position_weight = 1.0 / (1.0 + pos as f32 * 0.1);
                let length_norm = 1.0 / (1.0 + (doc_len / 50.0).sqrt());
                total_score += tf_score * idf_approx * position_weight * length_norm;
            }
        }

        let coverage = matched_terms as f32 / query_terms.len() as f32;
        let raw_score = total_score + coverage * 0.3;
        (raw_score / (raw_score + 1.0)).min(1.0)
    }
}

fn mean(a: Option<f32>, b: Option<f32>) -> f32 {
    match (a, b) {
        (Some(a), Some(b)) => (a + b) / 2.0,
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn doc(score: f32) -> Document {
        let mut d = Document::new("text".to_string(), HashMap::new());
        d.retrieval_score = Some(score);
        d
    }

    #[test]
    fn fallback_keeps_top_k_by_retrieval_score() {
        let docs = vec![doc(0.1), doc(0.9), doc(0.5)];
        let kept = fallback_by_retrieval_score(docs, 2);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].retrieval_score, Some(0.9));
        assert_eq!(kept[1].retrieval_score, Some(0.5));
    }

    #[test]
    fn fallback_sets_rerank_and_combined_score_from_retrieval_score() {
        let kept = fallback_by_retrieval_score(vec![doc(0.7)], 1);
        assert_eq!(kept[0].rerank_score, Some(0.7));
        assert_eq!(kept[0].combined_score, Some(0.7));
    }

    #[test]
    fn mean_falls_back_to_single_side() {
        assert_eq!(mean(Some(0.4), None), 0.4);
        assert_eq!(mean(None, None), 0.0);
    }

    #[test]
    fn simple_scorer_favors_term_overlap() {
        let matching = SimpleScorer::score("gold loan interest rate", "the gold loan interest rate is low");
        let unrelated = SimpleScorer::score("gold loan interest rate", "completely different topic entirely");
        assert!(matching > unrelated);
    }

    #[test]
    fn cascaded_fallback_uses_lexical_scoring_when_it_has_signal() {
        let mut a = Document::new("gold loan interest rate details".to_string(), HashMap::new());
        a.retrieval_score = Some(0.2);
        let mut b = Document::new("unrelated passage about something else".to_string(), HashMap::new());
        b.retrieval_score = Some(0.9);

        let ranked = cascaded_fallback(vec![a, b], "gold loan interest rate", 2);
        assert_eq!(ranked[0].text, "gold loan interest rate details");
        assert!(ranked[0].rerank_score.is_some());
    }

    #[test]
    fn cascaded_fallback_falls_back_to_retrieval_order_without_lexical_signal() {
        let docs = vec![doc(0.1), doc(0.9)];
        let ranked = cascaded_fallback(docs, "###", 2);
        assert_eq!(ranked[0].retrieval_score, Some(0.9));
    }
}
