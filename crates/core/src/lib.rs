//! Core data model, traits, and errors shared across the workspace.
//!
//! This crate carries no I/O and no business logic of its own: it defines
//! the types that flow through the pipeline (`Document`, `QueryRequest`,
//! `SessionState`, `Event`, ...) and the trait seams (`Retriever`,
//! `LanguageModel`) that `docqa-retrieval`, `docqa-llm`, and
//! `docqa-orchestrator` implement or consume.

pub mod category;
pub mod context_metadata;
pub mod document;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod query;
pub mod runtime_context;
pub mod session;
pub mod traits;

pub use category::ErrorCategory;
pub use context_metadata::ContextMetadata;
pub use document::Document;
pub use error::{Error, Result};
pub use event::Event;
pub use pipeline::{PipelineNode, PipelineState};
pub use query::{FilterValue, QueryRequest};
pub use runtime_context::{ExpertiseLevel, LanguagePreference, ResponseStyle, RuntimeContext};
pub use session::{Message, Role, SessionState, MAX_RETRIES};
pub use traits::{ChatMessage, ChatRequest, ChatResponse, ChatRole, LanguageModel};
pub use traits::{CheckpointBackend, RetrieveOptions, Retriever};
