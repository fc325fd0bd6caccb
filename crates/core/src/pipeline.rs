//! Pipeline node and state-machine identifiers (§4.1).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineNode {
    ValidateInput,
    Retrieve,
    Rerank,
    Grade,
    Generate,
    RewriteQuery,
    ValidateOutput,
}

impl PipelineNode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineNode::ValidateInput => "validate_input",
            PipelineNode::Retrieve => "retrieve",
            PipelineNode::Rerank => "rerank",
            PipelineNode::Grade => "grade",
            PipelineNode::Generate => "generate",
            PipelineNode::RewriteQuery => "rewrite_query",
            PipelineNode::ValidateOutput => "validate_output",
        }
    }
}

/// State machine driven by the pipeline runtime (C9). `RewriteQuery`
/// unconditionally transitions back to `Retrieve`; `Done` and `Error` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    ValidateInput,
    Retrieve,
    Rerank,
    Grade,
    Generate,
    RewriteQuery,
    ValidateOutput,
    Done,
    Error,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Error)
    }

    pub fn node(&self) -> Option<PipelineNode> {
        match self {
            PipelineState::ValidateInput => Some(PipelineNode::ValidateInput),
            PipelineState::Retrieve => Some(PipelineNode::Retrieve),
            PipelineState::Rerank => Some(PipelineNode::Rerank),
            PipelineState::Grade => Some(PipelineNode::Grade),
            PipelineState::Generate => Some(PipelineNode::Generate),
            PipelineState::RewriteQuery => Some(PipelineNode::RewriteQuery),
            PipelineState::ValidateOutput => Some(PipelineNode::ValidateOutput),
            PipelineState::Done | PipelineState::Error => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_done_and_error_are_terminal() {
        assert!(PipelineState::Done.is_terminal());
        assert!(PipelineState::Error.is_terminal());
        assert!(!PipelineState::Grade.is_terminal());
    }
}
