//! Streaming event protocol (C11, §3 Event, §4.11 ordering contract).
//!
//! A tagged enum (`#[serde(tag = "event_type")]`) so each event becomes a
//! single `data:` line of JSON over SSE.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::ErrorCategory;
use crate::context_metadata::ContextMetadata;
use crate::document::Document;
use crate::pipeline::PipelineNode;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum Event {
    ThreadCreated {
        thread_id: String,
        timestamp: DateTime<Utc>,
    },
    NodeStart {
        node: PipelineNode,
        timestamp: DateTime<Utc>,
    },
    NodeEnd {
        node: PipelineNode,
        summary: serde_json::Value,
        timestamp: DateTime<Utc>,
    },
    Warning {
        message: String,
        node: Option<PipelineNode>,
        timestamp: DateTime<Utc>,
    },
    Generation {
        answer: String,
        sources: Vec<Document>,
        context_metadata: ContextMetadata,
        thread_id: String,
        timestamp: DateTime<Utc>,
    },
    Error {
        category: ErrorCategory,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    pub fn thread_created(thread_id: impl Into<String>) -> Self {
        Event::ThreadCreated {
            thread_id: thread_id.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn node_start(node: PipelineNode) -> Self {
        Event::NodeStart {
            node,
            timestamp: Utc::now(),
        }
    }

    pub fn node_end(node: PipelineNode, summary: serde_json::Value) -> Self {
        Event::NodeEnd {
            node,
            summary,
            timestamp: Utc::now(),
        }
    }

    pub fn warning(message: impl Into<String>, node: Option<PipelineNode>) -> Self {
        Event::Warning {
            message: message.into(),
            node,
            timestamp: Utc::now(),
        }
    }

    pub fn error(category: ErrorCategory, message: impl Into<String>) -> Self {
        Event::Error {
            category,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Terminal events end the stream: `generation` or `error` (§4.11.4).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Generation { .. } | Event::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_generation_and_error_are_terminal() {
        assert!(!Event::thread_created("t-1").is_terminal());
        assert!(!Event::node_start(PipelineNode::Retrieve).is_terminal());
        assert!(Event::error(ErrorCategory::Cancelled, "cancelled").is_terminal());
    }

    #[test]
    fn event_type_tag_round_trips() {
        let event = Event::warning("pii masked", Some(PipelineNode::ValidateInput));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "warning");
    }
}
