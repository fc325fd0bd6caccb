//! Grader (C6, §4.4): single batch LLM relevance call with a structured JSON
//! protocol and a confidence filter.

use std::sync::Arc;

use serde::Deserialize;

use docqa_core::traits::{ChatMessage, ChatRequest, LanguageModel};
use docqa_core::Document;

const GRADER_MODEL_TEMPERATURE: f32 = 0.0;
const GRADER_MAX_TOKENS: usize = 2048;

#[derive(Debug, Deserialize)]
struct GradeEntry {
    doc_id: usize,
    relevant: bool,
    confidence: f32,
    #[serde(default)]
    #[allow(dead_code)]
    reason: String,
}

/// Outcome of a single grading round: the documents annotated with
/// `grading_*` fields, the count kept after the confidence filter, any
/// non-fatal warning (`grader_parse_failure`), and the heuristic pre-check
/// score recorded for telemetry.
pub struct GradeOutcome {
    pub documents: Vec<Document>,
    pub kept_count: usize,
    pub warning: Option<String>,
    pub heuristic_sufficiency: f32,
}

/// Cheap heuristic pre-check (result count, average score, score spread) run
/// ahead of the LLM grading call purely for observability. The grader always
/// runs regardless of what this scores (§4.4 requires grading every document
/// reaching C6); the score is recorded in telemetry and used nowhere else.
pub struct SufficiencyChecker {
    min_results: usize,
    min_avg_score: f32,
}

impl SufficiencyChecker {
    pub fn new() -> Self {
        Self { min_results: 1, min_avg_score: 0.3 }
    }

    /// Score sufficiency in `[0, 1]` from the top 3 documents' retrieval
    /// scores: count, average, and spread (tight spread earns a small bonus).
    pub fn score(&self, documents: &[Document]) -> f32 {
        if documents.len() < self.min_results {
            return 0.0;
        }

        let top: Vec<f32> = documents.iter().take(3).filter_map(|d| d.retrieval_score).collect();
        if top.is_empty() {
            return 0.0;
        }

        let avg_score = top.iter().sum::<f32>() / top.len() as f32;
        if avg_score < self.min_avg_score {
            return avg_score / self.min_avg_score * 0.5;
        }

        let max_score = top.iter().cloned().fold(0.0f32, f32::max);
        let min_score = top.iter().cloned().fold(f32::MAX, f32::min);
        let consistency_bonus = if max_score - min_score < 0.2 { 0.1 } else { 0.0 };
        (avg_score.min(1.0) + consistency_bonus).min(1.0)
    }
}

impl Default for SufficiencyChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Grades all reranked documents in a single round-trip (§4.4: "target a
/// single round-trip regardless of document count").
pub async fn grade(
    llm: &Arc<dyn LanguageModel>,
    model: &str,
    query: &str,
    mut documents: Vec<Document>,
) -> docqa_core::Result<GradeOutcome> {
    let heuristic_sufficiency = SufficiencyChecker::new().score(&documents);

    if documents.is_empty() {
        return Ok(GradeOutcome { documents, kept_count: 0, warning: None, heuristic_sufficiency });
    }

    let prompt = build_grading_prompt(query, &documents);

    let request = ChatRequest {
        messages: vec![
            ChatMessage::system(
                "You are a strict relevance grader. Respond with a JSON array only, \
                 no prose. Each element: {\"doc_id\": int, \"relevant\": bool, \
                 \"confidence\": float between 0 and 1, \"reason\": string}.",
            ),
            ChatMessage::user(prompt),
        ],
        model: model.to_string(),
        temperature: GRADER_MODEL_TEMPERATURE,
        max_tokens: GRADER_MAX_TOKENS,
    };

    let response = llm.chat(request).await?;

    let warning = match parse_grades(&response.text, documents.len()) {
        Ok(grades) => {
            apply_grades(&mut documents, grades);
            None
        },
        Err(_) => {
            apply_fallback_all_relevant(&mut documents);
            Some("grader_parse_failure".to_string())
        },
    };

    let min_confidence = docqa_config::constants::pipeline::GRADE_CONFIDENCE_THRESHOLD;
    let kept_count = documents.iter().filter(|d| d.is_graded_relevant(min_confidence)).count();

    Ok(GradeOutcome { documents, kept_count, warning, heuristic_sufficiency })
}

fn build_grading_prompt(query: &str, documents: &[Document]) -> String {
    let mut prompt = format!(
        "Query: {query}\n\nGrade each document's relevance to the query. \
         Documents (doc_id: text):\n"
    );
    for (idx, doc) in documents.iter().enumerate() {
        let snippet: String = doc.text.chars().take(500).collect();
        prompt.push_str(&format!("{idx}: {snippet}\n"));
    }
    prompt
}

fn parse_grades(text: &str, expected_count: usize) -> Result<Vec<GradeEntry>, serde_json::Error> {
    let json_slice = extract_json_array(text).unwrap_or(text);
    let entries: Vec<GradeEntry> = serde_json::from_str(json_slice)?;
    let _ = expected_count;
    Ok(entries)
}

/// Models sometimes wrap the JSON array in prose or code fences; take the
/// outermost `[...]` span rather than requiring an exact match.
fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

fn apply_grades(documents: &mut [Document], grades: Vec<GradeEntry>) {
    let mut by_id = std::collections::HashMap::new();
    for entry in grades {
        by_id.insert(entry.doc_id, entry);
    }

    for (idx, doc) in documents.iter_mut().enumerate() {
        match by_id.remove(&idx) {
            Some(entry) => {
                doc.grading_relevant = Some(entry.relevant);
                doc.grading_confidence = Some(entry.confidence.clamp(0.0, 1.0));
                doc.grading_reason = Some(entry.reason);
            },
            None => {
                doc.grading_relevant = Some(false);
                doc.grading_confidence = Some(0.0);
                doc.grading_reason = Some("missing".to_string());
            },
        }
    }
}

/// Recall-preserving fallback (§4.4, §9 Open Questions): on JSON parse
/// failure, treat every document as relevant with confidence 0.5 rather than
/// discarding the whole set.
fn apply_fallback_all_relevant(documents: &mut [Document]) {
    for doc in documents.iter_mut() {
        doc.grading_relevant = Some(true);
        doc.grading_confidence = Some(0.5);
        doc.grading_reason = Some("grader_parse_failure".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_array_from_prose_wrapped_response() {
        let text = "Here is the result:\n[{\"doc_id\":0,\"relevant\":true,\"confidence\":0.9,\"reason\":\"ok\"}]\nDone.";
        let extracted = extract_json_array(text).unwrap();
        let parsed = parse_grades(extracted, 1).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(parsed[0].relevant);
    }

    #[test]
    fn missing_doc_ids_default_to_not_relevant() {
        let mut docs = vec![
            Document::new("a".to_string(), std::collections::HashMap::new()),
            Document::new("b".to_string(), std::collections::HashMap::new()),
        ];
        apply_grades(&mut docs, vec![GradeEntry { doc_id: 0, relevant: true, confidence: 0.9, reason: "ok".into() }]);
        assert_eq!(docs[1].grading_relevant, Some(false));
        assert_eq!(docs[1].grading_confidence, Some(0.0));
    }

    #[test]
    fn parse_failure_falls_back_to_all_relevant() {
        let mut docs = vec![Document::new("a".to_string(), std::collections::HashMap::new())];
        apply_fallback_all_relevant(&mut docs);
        assert_eq!(docs[0].grading_relevant, Some(true));
        assert_eq!(docs[0].grading_confidence, Some(0.5));
    }

    #[test]
    fn sufficiency_checker_scores_empty_as_zero() {
        assert_eq!(SufficiencyChecker::new().score(&[]), 0.0);
    }

    #[test]
    fn sufficiency_checker_rewards_high_consistent_scores() {
        let mut a = Document::new("a".to_string(), std::collections::HashMap::new());
        a.retrieval_score = Some(0.9);
        let mut b = Document::new("b".to_string(), std::collections::HashMap::new());
        b.retrieval_score = Some(0.85);
        let score = SufficiencyChecker::new().score(&[a, b]);
        assert!(score > 0.9);
    }
}
