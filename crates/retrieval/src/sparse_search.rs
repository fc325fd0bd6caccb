//! Lexical (BM25) search via Tantivy, the full-text half of hybrid
//! retrieval (§4.2). Absence of this index causes the retriever to fall
//! back to dense-only with a `warning` event, never an error.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use tantivy::{
    collector::TopDocs,
    query::QueryParser,
    schema::{Field, OwnedValue, Schema, TextFieldIndexing, TextOptions, STORED, STRING},
    tokenizer::{Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, TextAnalyzer},
    Index, IndexReader, IndexWriter, TantivyDocument,
};

use crate::RetrievalError;

#[derive(Debug, Clone)]
pub struct SparseConfig {
    pub index_path: Option<String>,
    pub top_k: usize,
    pub stemming: bool,
    pub language: String,
}

impl Default for SparseConfig {
    fn default() -> Self {
        Self {
            index_path: None,
            top_k: 20,
            stemming: true,
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SparseResult {
    pub id: String,
    pub score: f32,
    pub content: String,
    pub metadata: HashMap<String, String>,
}

#[allow(dead_code)]
pub struct SparseIndex {
    index: Index,
    reader: IndexReader,
    writer: RwLock<Option<IndexWriter>>,
    schema: Schema,
    id_field: Field,
    text_field: Field,
    source_field: Field,
    config: SparseConfig,
}

impl SparseIndex {
    pub fn new(config: SparseConfig) -> Result<Self, RetrievalError> {
        let mut schema_builder = Schema::builder();

        let text_options = TextOptions::default()
            .set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer("docqa")
                    .set_index_option(tantivy::schema::IndexRecordOption::WithFreqsAndPositions),
            )
            .set_stored();

        let id_field = schema_builder.add_text_field("id", STRING | STORED);
        let text_field = schema_builder.add_text_field("text", text_options.clone());
        let source_field = schema_builder.add_text_field("source", text_options);

        let schema = schema_builder.build();

        let index = if let Some(ref path) = config.index_path {
            let dir = tantivy::directory::MmapDirectory::open(Path::new(path))
                .map_err(|e| RetrievalError::Index(e.to_string()))?;
            Index::open_or_create(dir, schema.clone())
                .map_err(|e| RetrievalError::Index(e.to_string()))?
        } else {
            Index::create_in_ram(schema.clone())
        };

        let tokenizer = Self::build_tokenizer(&config);
        index.tokenizers().register("docqa", tokenizer);

        let reader = index.reader().map_err(|e| RetrievalError::Index(e.to_string()))?;

        let writer = index
            .writer(50_000_000)
            .map_err(|e| RetrievalError::Index(e.to_string()))?;

        Ok(Self {
            index,
            reader,
            writer: RwLock::new(Some(writer)),
            schema,
            id_field,
            text_field,
            source_field,
            config,
        })
    }

    /// `SimpleTokenizer` handles Unicode scripts (Cyrillic, Latin) without
    /// assuming ASCII; stemming is only meaningful for English.
    fn build_tokenizer(config: &SparseConfig) -> TextAnalyzer {
        let base = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(100))
            .filter(LowerCaser);

        if config.stemming && config.language == "en" {
            base.filter(Stemmer::new(Language::English)).build()
        } else {
            base.build()
        }
    }

    pub fn index_documents(&self, docs: &[(String, String, Option<String>)]) -> Result<(), RetrievalError> {
        let mut writer = self.writer.write();
        let writer = writer
            .as_mut()
            .ok_or_else(|| RetrievalError::Index("writer not available".to_string()))?;

        for (id, text, source) in docs {
            let mut tantivy_doc = TantivyDocument::default();
            tantivy_doc.add_text(self.id_field, id);
            tantivy_doc.add_text(self.text_field, text);
            if let Some(source) = source {
                tantivy_doc.add_text(self.source_field, source);
            }
            writer
                .add_document(tantivy_doc)
                .map_err(|e| RetrievalError::Index(e.to_string()))?;
        }

        writer.commit().map_err(|e| RetrievalError::Index(e.to_string()))?;
        self.reader.reload().map_err(|e| RetrievalError::Index(e.to_string()))?;

        Ok(())
    }

    pub fn search(&self, query: &str, top_k: Option<usize>) -> Result<Vec<SparseResult>, RetrievalError> {
        let k = top_k.unwrap_or(self.config.top_k);

        let searcher = self.reader.searcher();
        let query_parser = QueryParser::for_index(&self.index, vec![self.text_field, self.source_field]);

        let parsed = query_parser
            .parse_query(query)
            .map_err(|e| RetrievalError::Search(e.to_string()))?;

        let top_docs = searcher
            .search(&parsed, &TopDocs::with_limit(k))
            .map_err(|e| RetrievalError::Search(e.to_string()))?;

        let mut results = Vec::with_capacity(top_docs.len());

        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(doc_address)
                .map_err(|e| RetrievalError::Search(e.to_string()))?;

            let id = field_str(&doc, self.id_field).unwrap_or_default();
            let content = field_str(&doc, self.text_field).unwrap_or_default();
            let mut metadata = HashMap::new();
            if let Some(source) = field_str(&doc, self.source_field) {
                metadata.insert("source".to_string(), source);
            }

            results.push(SparseResult { id, score, content, metadata });
        }

        Ok(results)
    }

    pub fn doc_count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}

fn field_str(doc: &TantivyDocument, field: Field) -> Option<String> {
    match doc.get_first(field) {
        Some(OwnedValue::Str(s)) => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_and_search_roundtrip() {
        let index = SparseIndex::new(SparseConfig::default()).unwrap();
        index
            .index_documents(&[
                ("1".to_string(), "gold loan interest rate is ten percent".to_string(), None),
                ("2".to_string(), "apply for a gold loan online".to_string(), None),
            ])
            .unwrap();

        assert_eq!(index.doc_count(), 2);

        let results = index.search("interest rate", None).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].id, "1");
    }
}
