//! Query Rewriter (C8, §4.7): a single terse LLM call reformulating the
//! query when grading finds nothing relevant.

use std::sync::Arc;

use docqa_core::traits::{ChatMessage, ChatRequest, LanguageModel};
use docqa_core::Document;

const REWRITER_TEMPERATURE: f32 = 0.3;
const REWRITER_MAX_TOKENS: usize = 256;
const SNIPPET_CHARS: usize = 200;

/// Runs the rewrite call and validates the result. Returns the rewritten
/// query on success, or the original query unchanged when validation fails
/// (§4.7: "keep original and increment `retry_count` anyway").
pub async fn rewrite_query(
    llm: &Arc<dyn LanguageModel>,
    model: &str,
    original_query: &str,
    failed_documents: &[Document],
) -> docqa_core::Result<String> {
    let prompt = build_prompt(original_query, failed_documents);

    let request = ChatRequest {
        messages: vec![
            ChatMessage::system(
                "Reformulate the user's question to improve retrieval. Respond with \
                 only the reformulated question, in the same language as the original, \
                 no preamble.",
            ),
            ChatMessage::user(prompt),
        ],
        model: model.to_string(),
        temperature: REWRITER_TEMPERATURE,
        max_tokens: REWRITER_MAX_TOKENS,
    };

    let response = llm.chat(request).await?;
    let candidate = response.text.trim();

    Ok(if is_valid_rewrite(original_query, candidate) {
        candidate.to_string()
    } else {
        keyword_fallback(original_query).unwrap_or_else(|| original_query.to_string())
    })
}

/// Cheap keyword-based reformulation tried before giving up and keeping the
/// original query when the LLM rewrite is rejected (§4.7: "else keep
/// original"). Returns `None` when it has nothing better to offer.
fn keyword_fallback(original_query: &str) -> Option<String> {
    let keywords = extract_keywords(original_query);
    if keywords.is_empty() {
        return None;
    }
    let rewritten = keywords.join(" ");
    if rewritten.eq_ignore_ascii_case(original_query.trim()) {
        return None;
    }
    Some(rewritten)
}

fn extract_keywords(text: &str) -> Vec<String> {
    const STOPWORDS: &[&str] = &[
        "the", "a", "an", "is", "are", "was", "were", "be", "been", "i", "you", "we", "they", "it",
        "this", "that", "what", "which", "who", "whom", "whose", "to", "for", "in", "on", "at",
        "by", "with", "from", "and", "or", "but", "if", "then", "else",
    ];
    let stopwords: std::collections::HashSet<&str> = STOPWORDS.iter().copied().collect();

    text.to_lowercase()
        .split_whitespace()
        .filter(|w| w.len() > 2 && !stopwords.contains(w))
        .map(|w| w.to_string())
        .take(5)
        .collect()
}

fn build_prompt(original_query: &str, failed_documents: &[Document]) -> String {
    let mut prompt = format!("Original question: {original_query}\n");
    if !failed_documents.is_empty() {
        prompt.push_str("These retrieved passages were judged not relevant:\n");
        for doc in failed_documents.iter().take(3) {
            let snippet: String = doc.text.chars().take(SNIPPET_CHARS).collect();
            prompt.push_str(&format!("- {snippet}\n"));
        }
    }
    prompt
}

/// Non-empty, at most twice the original length, not identical (§4.7).
fn is_valid_rewrite(original: &str, candidate: &str) -> bool {
    if candidate.is_empty() {
        return false;
    }
    if candidate.eq_ignore_ascii_case(original.trim()) {
        return false;
    }
    candidate.chars().count() <= original.chars().count() * 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_rewrite() {
        assert!(!is_valid_rewrite("What is RAG?", ""));
    }

    #[test]
    fn rejects_identical_rewrite() {
        assert!(!is_valid_rewrite("What is RAG?", "What is RAG?"));
    }

    #[test]
    fn rejects_overlong_rewrite() {
        let original = "What is RAG?";
        let too_long = "w".repeat(original.chars().count() * 2 + 1);
        assert!(!is_valid_rewrite(original, &too_long));
    }

    #[test]
    fn accepts_reasonable_rewrite() {
        assert!(is_valid_rewrite("wat iz RGA??", "What is RAG?"));
    }

    #[test]
    fn extract_keywords_drops_stopwords_and_short_words() {
        let keywords = extract_keywords("What is the gold loan interest rate?");
        assert!(keywords.contains(&"gold".to_string()));
        assert!(!keywords.contains(&"the".to_string()));
        assert!(!keywords.contains(&"is".to_string()));
    }

    #[test]
    fn keyword_fallback_returns_none_when_nothing_to_offer() {
        assert!(keyword_fallback("is a an").is_none());
    }

    #[test]
    fn keyword_fallback_reformulates_from_content_words() {
        let rewritten = keyword_fallback("What is the gold loan interest rate?").unwrap();
        assert!(rewritten.contains("gold"));
    }
}
