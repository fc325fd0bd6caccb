//! Dense vector backend (Qdrant), the vector-store half of the hybrid
//! retrieval contract in §6 ("vector backend contract (consumed)").

use std::collections::HashMap;

use qdrant_client::{
    qdrant::{
        condition::ConditionOneOf, r#match::MatchValue, value::Kind, Condition,
        CreateCollectionBuilder, Distance, FieldCondition, Filter, Match, PointId, Range,
        SearchPointsBuilder, VectorParamsBuilder,
    },
    Qdrant,
};

use docqa_core::FilterValue;

use crate::RetrievalError;

#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    pub endpoint: String,
    pub collection: String,
    pub vector_dim: usize,
    pub distance: VectorDistance,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorDistance {
    Cosine,
    Euclidean,
    DotProduct,
}

impl From<VectorDistance> for Distance {
    fn from(d: VectorDistance) -> Self {
        match d {
            VectorDistance::Cosine => Distance::Cosine,
            VectorDistance::Euclidean => Distance::Euclid,
            VectorDistance::DotProduct => Distance::Dot,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    pub id: String,
    pub score: f32,
    pub content: String,
    pub metadata: HashMap<String, String>,
}

pub struct VectorStore {
    client: Qdrant,
    config: VectorStoreConfig,
}

impl VectorStore {
    pub async fn new(config: VectorStoreConfig) -> Result<Self, RetrievalError> {
        let mut builder = Qdrant::from_url(&config.endpoint);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
            tracing::info!("Qdrant connection using API key authentication");
        }

        let client = builder
            .build()
            .map_err(|e| RetrievalError::Connection(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Asserts the configured collection exists, creating it if absent
    /// (§6: `EMBEDDING_DIM` asserted on startup against vector collection).
    pub async fn ensure_collection(&self) -> Result<(), RetrievalError> {
        let exists = self
            .client
            .collection_exists(&self.config.collection)
            .await
            .map_err(|e| RetrievalError::VectorStore(e.to_string()))?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.config.collection).vectors_config(
                        VectorParamsBuilder::new(
                            self.config.vector_dim as u64,
                            Distance::from(self.config.distance),
                        ),
                    ),
                )
                .await
                .map_err(|e| RetrievalError::VectorStore(e.to_string()))?;
            return Ok(());
        }

        let info = self
            .client
            .collection_info(&self.config.collection)
            .await
            .map_err(|e| RetrievalError::VectorStore(e.to_string()))?;

        if let Some(result) = info.result {
            if let Some(params) = result.config.and_then(|c| c.params) {
                if let Some(vectors) = params.vectors_config.and_then(|v| v.config) {
                    if let qdrant_client::qdrant::vectors_config::Config::Params(p) = vectors {
                        if p.size as usize != self.config.vector_dim {
                            return Err(RetrievalError::VectorStore(format!(
                                "collection '{}' dimension {} does not match configured embedding_dim {}",
                                self.config.collection, p.size, self.config.vector_dim
                            )));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    pub async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filters: &HashMap<String, FilterValue>,
    ) -> Result<Vec<VectorSearchResult>, RetrievalError> {
        let qdrant_filter = build_filter(filters);

        let mut search_builder =
            SearchPointsBuilder::new(&self.config.collection, query_embedding.to_vec(), top_k as u64)
                .with_payload(true);

        if let Some(f) = qdrant_filter {
            search_builder = search_builder.filter(f);
        }

        let results = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| RetrievalError::Search(e.to_string()))?;

        Ok(results.result.into_iter().map(point_to_result).collect())
    }

    pub async fn collection_info(&self) -> Result<CollectionInfo, RetrievalError> {
        let info = self
            .client
            .collection_info(&self.config.collection)
            .await
            .map_err(|e| RetrievalError::VectorStore(e.to_string()))?;

        let points_count = info
            .result
            .map(|r| r.points_count.unwrap_or(0))
            .unwrap_or(0);

        Ok(CollectionInfo {
            name: self.config.collection.clone(),
            points_count,
        })
    }

    pub async fn healthy(&self) -> bool {
        self.client.health_check().await.is_ok()
    }
}

fn point_to_result(point: qdrant_client::qdrant::ScoredPoint) -> VectorSearchResult {
    let mut metadata = HashMap::new();
    let mut content = String::new();

    for (k, v) in point.payload {
        if k == "text" {
            if let Some(Kind::StringValue(s)) = v.kind {
                content = s;
            }
        } else if let Some(Kind::StringValue(s)) = v.kind {
            metadata.insert(k, s);
        }
    }

    let id = point
        .id
        .map(|pid| match pid.point_id_options {
            Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(u)) => u,
            Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(n)) => n.to_string(),
            None => String::new(),
        })
        .unwrap_or_default();

    VectorSearchResult {
        id,
        score: point.score,
        content,
        metadata,
    }
}

/// Translates `FilterValue` predicates into Qdrant's conjunctive filter
/// schema: equality, `in`-list, and `{gte,lte}` ranges (§4.2, §6).
fn build_filter(filters: &HashMap<String, FilterValue>) -> Option<Filter> {
    if filters.is_empty() {
        return None;
    }

    let mut must = Vec::new();

    for (key, value) in filters {
        let condition = match value {
            FilterValue::Eq(v) => Condition {
                condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                    key: key.clone(),
                    r#match: Some(Match {
                        match_value: Some(MatchValue::Keyword(value_to_string(v))),
                    }),
                    ..Default::default()
                })),
            },
            FilterValue::In(values) => Condition {
                condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                    key: key.clone(),
                    r#match: Some(Match {
                        match_value: Some(MatchValue::Keywords(
                            qdrant_client::qdrant::RepeatedStrings {
                                strings: values.iter().map(value_to_string).collect(),
                            },
                        )),
                    }),
                    ..Default::default()
                })),
            },
            FilterValue::Range { gte, lte } => Condition {
                condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                    key: key.clone(),
                    range: Some(Range {
                        gte: *gte,
                        lte: *lte,
                        ..Default::default()
                    }),
                    ..Default::default()
                })),
            },
        };
        must.push(condition);
    }

    Some(Filter {
        must,
        ..Default::default()
    })
}

fn value_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub name: String,
    pub points_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn eq_filter_builds_single_must_condition() {
        let mut filters = HashMap::new();
        filters.insert("category".to_string(), FilterValue::Eq(json!("loans")));
        let filter = build_filter(&filters).unwrap();
        assert_eq!(filter.must.len(), 1);
    }

    #[test]
    fn empty_filters_produce_no_filter() {
        assert!(build_filter(&HashMap::new()).is_none());
    }
}
