//! Context Budgeter (C1, §4.5): per-model token table and packing policy.

use docqa_core::document::metadata_keys;
use docqa_core::{ContextMetadata, Document};

/// Context window and reserved-output tokens per model family (§4.5).
#[derive(Debug, Clone, Copy)]
pub struct ModelWindow {
    pub window: usize,
    pub reserve: usize,
}

/// Looks up the per-model table by substring match on family name, falling
/// back to the gpt-4 legacy row (smallest window) if the model is unknown
/// (packing must never silently assume a larger budget than is safe).
pub fn model_window(model_name: &str) -> ModelWindow {
    let name = model_name.to_lowercase();
    if name.contains("claude-4") || name.contains("claude4") {
        ModelWindow { window: 200_000, reserve: 4_000 }
    } else if name.contains("gpt-4o") {
        ModelWindow { window: 128_000, reserve: 4_000 }
    } else if name.contains("llama-3.1") || name.contains("llama3.1") {
        ModelWindow { window: 128_000, reserve: 4_000 }
    } else if name.contains("gpt-4") {
        ModelWindow { window: 8_192, reserve: 4_000 }
    } else {
        ModelWindow { window: 8_192, reserve: 4_000 }
    }
}

/// Lightweight character-to-token estimator (~4 characters/token); exact
/// tokenization is not required, the packer only needs to never exceed the
/// declared window (§4.5).
pub fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() as f32 / 4.0).ceil() as usize
}

pub struct PackedContext {
    pub documents_included: Vec<Document>,
    pub documents_total_tokens: usize,
    pub tokens_input: usize,
}

/// Packs graded documents into the available token budget in grading order:
/// include whole documents that fit; truncate at a sentence boundary if the
/// remaining budget is at least `MIN_DOC_TOKENS`; otherwise stop (§4.5).
pub fn pack_documents(
    model_name: &str,
    fixed_tokens: usize,
    documents: Vec<Document>,
    min_doc_tokens: usize,
) -> PackedContext {
    let window = model_window(model_name);
    let mut available = window.window.saturating_sub(window.reserve).saturating_sub(fixed_tokens);

    let mut included = Vec::new();
    let mut total_tokens = 0;

    for mut doc in documents {
        let doc_tokens = estimate_tokens(&doc.text);

        if doc_tokens <= available {
            available -= doc_tokens;
            total_tokens += doc_tokens;
            included.push(doc);
            continue;
        }

        if available >= min_doc_tokens {
            doc.text = truncate_to_sentence_boundary(&doc.text, available);
            let truncated_tokens = estimate_tokens(&doc.text);
            total_tokens += truncated_tokens;
            available = available.saturating_sub(truncated_tokens);
            included.push(doc);
        }

        break;
    }

    PackedContext {
        documents_included: included,
        documents_total_tokens: total_tokens,
        tokens_input: fixed_tokens + total_tokens,
    }
}

/// Truncates `text` to approximately `budget_tokens`, backing off to the
/// last sentence boundary (`.`, `!`, `?`) so a document is never cut
/// mid-sentence.
fn truncate_to_sentence_boundary(text: &str, budget_tokens: usize) -> String {
    let budget_chars = budget_tokens * 4;
    if text.chars().count() <= budget_chars {
        return text.to_string();
    }

    let prefix: String = text.chars().take(budget_chars).collect();
    match prefix.rfind(['.', '!', '?']) {
        Some(idx) if idx > 0 => prefix[..=idx].to_string(),
        _ => prefix,
    }
}

/// Computes `context_metadata` for the assembled generation call (§3, §4.5).
pub fn build_context_metadata(
    model_name: &str,
    packed: &PackedContext,
    documents_retrieved: usize,
    output_tokens: usize,
) -> ContextMetadata {
    let window = model_window(model_name);
    let denominator = window.window.saturating_sub(window.reserve).max(1) as f32;

    ContextMetadata {
        model_name: model_name.to_string(),
        context_window: window.window,
        tokens_input: packed.tokens_input,
        tokens_output: output_tokens,
        tokens_reserved: window.reserve,
        context_usage_percent: (packed.tokens_input as f32 / denominator) * 100.0,
        documents_retrieved,
        documents_included: packed.documents_included.len(),
        confidence_score: 0.0,
        has_citations: false,
        is_generic: false,
        validation_passed: true,
        warnings: Vec::new(),
    }
}

#[allow(dead_code)]
fn document_source_label(doc: &Document) -> String {
    doc.metadata
        .get(metadata_keys::SOURCE)
        .cloned()
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn unknown_model_falls_back_to_smallest_window() {
        let w = model_window("some-unlisted-model");
        assert_eq!(w.window, 8_192);
    }

    #[test]
    fn claude_4_gets_200k_window() {
        let w = model_window("claude-4-sonnet");
        assert_eq!(w.window, 200_000);
    }

    #[test]
    fn packing_stops_when_remaining_budget_below_min_doc_tokens() {
        let window = model_window("gpt-4");
        let fixed = window.window - window.reserve - 50;
        let docs = vec![
            Document::new("short".to_string(), HashMap::new()),
            Document::new("this should never be included".to_string(), HashMap::new()),
        ];
        let packed = pack_documents("gpt-4", fixed, docs, 128);
        assert_eq!(packed.documents_included.len(), 0);
    }

    #[test]
    fn whole_document_included_when_it_fits() {
        let docs = vec![Document::new("hello world".to_string(), HashMap::new())];
        let packed = pack_documents("claude-4", 0, docs, 128);
        assert_eq!(packed.documents_included.len(), 1);
        assert_eq!(packed.documents_included[0].text, "hello world");
    }
}
