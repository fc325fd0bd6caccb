//! Generator (C7, §4.6): packs sources via the context budgeter, composes
//! the prompt via the prompt factory, and synthesises the answer.

use std::sync::Arc;

use docqa_core::runtime_context::RuntimeContext;
use docqa_core::session::Message;
use docqa_core::traits::{ChatMessage, ChatRequest, LanguageModel};
use docqa_core::{ContextMetadata, Document};
use docqa_llm::PromptFactory;
use docqa_retrieval::{build_context_metadata, estimate_tokens, pack_documents};

const GENERATOR_MAX_TOKENS: usize = 1024;

pub struct GenerationOutcome {
    pub answer: String,
    pub context_metadata: ContextMetadata,
}

/// Builds `[system, …history, user(query), user(packed_sources)]`, calls the
/// LLM, and computes `context_metadata` including the output-token estimate
/// (§4.6).
#[allow(clippy::too_many_arguments)]
pub async fn generate(
    llm: &Arc<dyn LanguageModel>,
    model: &str,
    query: &str,
    detected_language: &str,
    runtime_context: &RuntimeContext,
    history: &[Message],
    graded_documents: Vec<Document>,
    documents_retrieved: usize,
) -> docqa_core::Result<GenerationOutcome> {
    let system_prompt = PromptFactory::system_prompt(
        query,
        detected_language,
        runtime_context.expertise_level,
        runtime_context.response_style,
        runtime_context.enable_citations,
    );

    let mut fixed_tokens = estimate_tokens(&system_prompt) + estimate_tokens(query);
    for message in history {
        fixed_tokens += estimate_tokens(&message.text);
    }

    let packed = pack_documents(
        model,
        fixed_tokens,
        graded_documents,
        docqa_config::constants::retrieval::MIN_DOC_TOKENS,
    );

    let sources_block = render_sources(&packed.documents_included);

    let mut messages = vec![ChatMessage::system(system_prompt)];
    for message in history {
        messages.push(match message.role {
            docqa_core::session::Role::User => ChatMessage::user(message.text.clone()),
            docqa_core::session::Role::Assistant => ChatMessage::assistant(message.text.clone()),
        });
    }
    messages.push(ChatMessage::user(query.to_string()));
    messages.push(ChatMessage::user(sources_block));

    let request = ChatRequest {
        messages,
        model: model.to_string(),
        temperature: 0.2,
        max_tokens: GENERATOR_MAX_TOKENS,
    };

    let response = llm.chat(request).await?;

    let mut context_metadata =
        build_context_metadata(model, &packed, documents_retrieved, estimate_tokens(&response.text));

    if packed.documents_included.len() < documents_retrieved {
        context_metadata.add_warning("truncated");
    }

    Ok(GenerationOutcome { answer: response.text, context_metadata })
}

fn render_sources(documents: &[Document]) -> String {
    let mut block = String::from("Source passages:\n");
    for (idx, doc) in documents.iter().enumerate() {
        let source = doc.source().unwrap_or("unknown");
        block.push_str(&format!("[{idx}] ({source}) {text}\n", text = doc.text));
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn render_sources_includes_index_and_source() {
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), "handbook.pdf".to_string());
        let doc = Document::new("RAG combines retrieval and generation.".to_string(), metadata);
        let block = render_sources(std::slice::from_ref(&doc));
        assert!(block.contains("[0]"));
        assert!(block.contains("handbook.pdf"));
    }
}
