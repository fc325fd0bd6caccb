//! Answer-accompanying metadata (§3 ContextMetadata, §4.5 packing output).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextMetadata {
    pub model_name: String,
    pub context_window: usize,
    pub tokens_input: usize,
    pub tokens_output: usize,
    pub tokens_reserved: usize,
    pub context_usage_percent: f32,
    pub documents_retrieved: usize,
    pub documents_included: usize,
    pub confidence_score: f32,
    pub has_citations: bool,
    pub is_generic: bool,
    pub validation_passed: bool,
    pub warnings: Vec<String>,
}

impl ContextMetadata {
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}
