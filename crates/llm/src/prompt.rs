//! Prompt factory (C7): composes the system prompt from three axes
//! (detected/preferred language dialect, query class, and expertise level)
//! plus the grounding/citation/length policy (§4.6).

use docqa_core::runtime_context::{ExpertiseLevel, ResponseStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryClass {
    Definition,
    Comparison,
    HowTo,
    List,
    Analytical,
    Factual,
}

impl QueryClass {
    /// Keyword heuristic classifier (§4.6). English keywords only; other
    /// languages fall through to `Factual`, matching the fallback-en
    /// behaviour used elsewhere in the prompt factory.
    pub fn classify(query: &str) -> Self {
        let lower = query.to_lowercase();
        if lower.starts_with("what is") || lower.starts_with("define") || lower.contains("meaning of") {
            QueryClass::Definition
        } else if lower.contains(" vs ") || lower.contains("difference between") || lower.contains("compare") {
            QueryClass::Comparison
        } else if lower.starts_with("how to") || lower.starts_with("how do i") || lower.starts_with("how can") {
            QueryClass::HowTo
        } else if lower.starts_with("list") || lower.contains("what are the") || lower.contains("enumerate") {
            QueryClass::List
        } else if lower.contains("why") || lower.contains("analyze") || lower.contains("impact of") {
            QueryClass::Analytical
        } else {
            QueryClass::Factual
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            QueryClass::Definition => "Give a precise definition first, then brief elaboration.",
            QueryClass::Comparison => "Structure the answer around the points of comparison explicitly.",
            QueryClass::HowTo => "Answer as an ordered list of concrete steps.",
            QueryClass::List => "Answer as a bulleted list covering every distinct item found in the sources.",
            QueryClass::Analytical => "Explain the underlying reasoning, not just the conclusion.",
            QueryClass::Factual => "Answer directly and concisely.",
        }
    }
}

/// Supported dialects; anything else falls back to English (§4.6).
pub fn normalize_language(language: &str) -> &'static str {
    match language {
        "ru" => "ru",
        "uz" => "uz",
        _ => "en",
    }
}

fn language_instruction(language: &str) -> &'static str {
    match language {
        "ru" => "Respond in Russian.",
        "uz" => "Respond in Uzbek.",
        _ => "Respond in English.",
    }
}

fn expertise_instruction(level: ExpertiseLevel) -> &'static str {
    match level {
        ExpertiseLevel::Beginner => "Explain in plain language, avoiding jargon; define any technical term you must use.",
        ExpertiseLevel::Intermediate => "Assume general familiarity with the subject but explain specialized terms.",
        ExpertiseLevel::Expert => "Use precise technical terminology without hand-holding.",
        ExpertiseLevel::General => "Write for an educated non-specialist.",
    }
}

fn length_instruction(style: ResponseStyle) -> &'static str {
    match style {
        ResponseStyle::Concise => "Keep the answer to at most two or three sentences.",
        ResponseStyle::Balanced => "Keep the answer focused; a short paragraph is usually enough.",
        ResponseStyle::Detailed => "Give a thorough answer covering all relevant nuance in the sources.",
    }
}

pub struct PromptFactory;

impl PromptFactory {
    /// Build the system prompt: grounding requirement, citation policy,
    /// length hint, and language instruction (§4.6).
    pub fn system_prompt(
        query: &str,
        language: &str,
        expertise_level: ExpertiseLevel,
        response_style: ResponseStyle,
        enable_citations: bool,
    ) -> String {
        let class = QueryClass::classify(query);
        let language = normalize_language(language);

        let citation_policy = if enable_citations {
            "Cite every claim drawn from the sources using [source, page] markers. \
             If the sources do not support an answer, say so explicitly rather than guessing."
        } else {
            "Do not include citation markers in the answer, but only state what the sources support."
        };

        format!(
            "You answer questions strictly using the provided source passages. \
             Never invent facts not present in the sources. {grounding}\n\
             {citation_policy}\n\
             {length}\n\
             {expertise}\n\
             {class}\n\
             {language}",
            grounding = "If the sources are insufficient to answer, say you don't have enough information.",
            citation_policy = citation_policy,
            length = length_instruction(response_style),
            expertise = expertise_instruction(expertise_level),
            class = class.instruction(),
            language = language_instruction(language),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_how_to_queries() {
        assert_eq!(QueryClass::classify("How to reset my password?"), QueryClass::HowTo);
    }

    #[test]
    fn classifies_definition_queries() {
        assert_eq!(QueryClass::classify("What is RRF?"), QueryClass::Definition);
    }

    #[test]
    fn unrecognized_language_falls_back_to_english() {
        assert_eq!(normalize_language("fr"), "en");
    }

    #[test]
    fn system_prompt_includes_citation_policy_when_enabled() {
        let prompt = PromptFactory::system_prompt(
            "What is RRF?",
            "en",
            ExpertiseLevel::General,
            ResponseStyle::Balanced,
            true,
        );
        assert!(prompt.contains("Cite every claim"));
    }
}
