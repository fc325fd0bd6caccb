//! Pluggable backend seams: retrieval (C4), the LLM provider abstraction
//! (§6), and the checkpoint backend (§4.10), consumed by the orchestrator
//! without depending on concrete backends.

mod checkpoint;
mod llm;
mod retriever;

pub use checkpoint::CheckpointBackend;
pub use llm::{ChatMessage, ChatRequest, ChatResponse, ChatRole, LanguageModel};
pub use retriever::{RetrievalOutcome, RetrieveOptions, Retriever, RetrieverHealth};
