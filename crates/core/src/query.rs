//! Query request and filter translation (§3, §4.2).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::runtime_context::RuntimeContext;

/// A single filter value, translated by the retrieval adapter into the
/// vector backend's predicate schema (equality, range, conjunction).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Eq(serde_json::Value),
    Range {
        #[serde(skip_serializing_if = "Option::is_none")]
        gte: Option<serde_json::Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        lte: Option<serde_json::Value>,
    },
    In(Vec<serde_json::Value>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryRequest {
    pub query_text: String,
    pub thread_id: Option<String>,
    pub filters: HashMap<String, FilterValue>,
    pub runtime_context: RuntimeContext,
    pub top_k: Option<usize>,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            query_text: String::new(),
            thread_id: None,
            filters: HashMap::new(),
            runtime_context: RuntimeContext::default(),
            top_k: None,
        }
    }
}

impl QueryRequest {
    pub fn new(query_text: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            ..Default::default()
        }
    }
}
