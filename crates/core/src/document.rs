//! Retrieved passage type threaded through the pipeline (retrieve -> rerank -> grade -> generate).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Reserved metadata keys that have pipeline-visible meaning; everything else
/// in `metadata` is opaque and passed through untouched.
pub mod metadata_keys {
    pub const SOURCE: &str = "source";
    pub const PAGE_NUMBER: &str = "page_number";
    pub const LANGUAGE: &str = "language";
    pub const DOCUMENT_ID: &str = "document_id";
    pub const CHUNK_INDEX: &str = "chunk_index";
    pub const FILE_HASH: &str = "file_hash";
}

/// A retrieved passage with progressively-populated score slots.
///
/// `retrieval_score` is set by the retrieval adapter (C4), `rerank_score` and
/// `combined_score` by the reranker adapter (C5), and the `grading_*` fields
/// by the grader (C6). A document reaching the grader is guaranteed (by
/// construction of the pipeline) to have both `retrieval_score` and
/// `rerank_score` set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    pub retrieval_score: Option<f32>,
    pub rerank_score: Option<f32>,
    pub combined_score: Option<f32>,

    pub grading_relevant: Option<bool>,
    pub grading_confidence: Option<f32>,
    pub grading_reason: Option<String>,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: HashMap<String, String>) -> Self {
        Self {
            text: text.into(),
            metadata,
            retrieval_score: None,
            rerank_score: None,
            combined_score: None,
            grading_relevant: None,
            grading_confidence: None,
            grading_reason: None,
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.metadata.get(metadata_keys::SOURCE).map(String::as_str)
    }

    pub fn language(&self) -> Option<&str> {
        self.metadata
            .get(metadata_keys::LANGUAGE)
            .map(String::as_str)
    }

    pub fn document_id(&self) -> Option<&str> {
        self.metadata
            .get(metadata_keys::DOCUMENT_ID)
            .map(String::as_str)
    }

    /// Keep this document if it cleared grading (§4.1 routing decision: `R`).
    pub fn is_graded_relevant(&self, min_confidence: f32) -> bool {
        self.grading_relevant == Some(true)
            && self.grading_confidence.unwrap_or(0.0) >= min_confidence
    }

    /// Invariant check used by tests and debug assertions: a document that
    /// reached the grader must carry both retrieval and rerank scores.
    pub fn has_retrieval_and_rerank_scores(&self) -> bool {
        self.retrieval_score.is_some() && self.rerank_score.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graded_relevant_respects_confidence_floor() {
        let mut doc = Document::new("text", HashMap::new());
        doc.grading_relevant = Some(true);
        doc.grading_confidence = Some(0.4);
        assert!(!doc.is_graded_relevant(0.5));
        doc.grading_confidence = Some(0.5);
        assert!(doc.is_graded_relevant(0.5));
    }

    #[test]
    fn metadata_accessors_read_reserved_keys() {
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), "handbook.pdf".to_string());
        let doc = Document::new("text", metadata);
        assert_eq!(doc.source(), Some("handbook.pdf"));
        assert_eq!(doc.language(), None);
    }
}
