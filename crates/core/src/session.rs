//! Per-thread conversational state (C10, §3 SessionState, §4.10).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context_metadata::ContextMetadata;

pub const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Holds everything the runtime needs to resume or audit a thread. Mutated
/// only by the pipeline runtime under the session store's per-thread lock
/// (§4.10); `revision` must increase strictly monotonically on every
/// mutation (§3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub thread_id: String,
    pub messages: Vec<Message>,
    pub retry_count: u32,
    pub last_query_language: Option<String>,
    pub last_context_metadata: Option<ContextMetadata>,
    pub revision: u64,
}

impl SessionState {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
            retry_count: 0,
            last_query_language: None,
            last_context_metadata: None,
            revision: 0,
        }
    }

    /// Append a message and bump the revision. Every mutator on this type
    /// funnels through here or `bump_revision` so revision strictly
    /// increases.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.bump_revision();
    }

    pub fn bump_revision(&mut self) {
        self.revision += 1;
    }

    pub fn reset(&mut self) {
        self.messages.clear();
        self.retry_count = 0;
        self.last_query_language = None;
        self.last_context_metadata = None;
        self.bump_revision();
    }

    pub fn increment_retry(&mut self) -> u32 {
        self.retry_count += 1;
        self.bump_revision();
        self.retry_count
    }

    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= MAX_RETRIES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_increases_on_every_mutation() {
        let mut state = SessionState::new("t-1");
        assert_eq!(state.revision, 0);
        state.append(Message::user("hello"));
        assert_eq!(state.revision, 1);
        state.increment_retry();
        assert_eq!(state.revision, 2);
        state.reset();
        assert_eq!(state.revision, 3);
        assert!(state.messages.is_empty());
    }

    #[test]
    fn retries_exhausted_at_max() {
        let mut state = SessionState::new("t-1");
        for _ in 0..MAX_RETRIES {
            state.increment_retry();
        }
        assert!(state.retries_exhausted());
    }
}
