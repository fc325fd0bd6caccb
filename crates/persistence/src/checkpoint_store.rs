//! `CheckpointBackend` implementation over ScyllaDB (§4.10, §6).

use async_trait::async_trait;
use chrono::Utc;

use docqa_core::error::{Error, Result};
use docqa_core::session::SessionState;
use docqa_core::traits::CheckpointBackend;

use crate::client::ScyllaClient;
use crate::error::PersistenceError;

pub struct ScyllaCheckpointStore {
    client: ScyllaClient,
}

impl ScyllaCheckpointStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CheckpointBackend for ScyllaCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Option<SessionState>> {
        let query = format!(
            "SELECT session_json FROM {}.checkpoints WHERE thread_id = ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (thread_id,))
            .await
            .map_err(|e| Error::from(PersistenceError::Query(e.to_string())))?;

        let rows = result
            .into_rows_result()
            .map_err(|e| Error::from(PersistenceError::Query(e.to_string())))?;

        let mut iter = rows
            .rows::<(String,)>()
            .map_err(|e| Error::from(PersistenceError::Query(e.to_string())))?;

        match iter.next() {
            Some(row) => {
                let (json,) = row.map_err(|e| Error::from(PersistenceError::Query(e.to_string())))?;
                let state: SessionState = serde_json::from_str(&json)
                    .map_err(|e| Error::from(PersistenceError::Serialization(e.to_string())))?;
                Ok(Some(state))
            },
            None => Ok(None),
        }
    }

    async fn save(&self, thread_id: &str, state: &SessionState) -> Result<()> {
        let json = serde_json::to_string(state)
            .map_err(|e| Error::from(PersistenceError::Serialization(e.to_string())))?;

        let query = format!(
            "INSERT INTO {}.checkpoints (thread_id, revision, session_json, updated_at) VALUES (?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(query, (thread_id, state.revision as i64, json, Utc::now()))
            .await
            .map_err(|e| Error::from(PersistenceError::Query(e.to_string())))?;

        Ok(())
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let query = format!("SELECT thread_id FROM {}.checkpoints", self.client.keyspace());

        let result = self
            .client
            .session()
            .query_unpaged(query, ())
            .await
            .map_err(|e| Error::from(PersistenceError::Query(e.to_string())))?;

        let rows = result
            .into_rows_result()
            .map_err(|e| Error::from(PersistenceError::Query(e.to_string())))?;

        let thread_ids: Vec<String> = rows
            .rows::<(String,)>()
            .map_err(|e| Error::from(PersistenceError::Query(e.to_string())))?
            .filter_map(|r| r.ok())
            .map(|(id,)| id)
            .filter(|id| prefix.map(|p| id.starts_with(p)).unwrap_or(true))
            .collect();

        Ok(thread_ids)
    }

    async fn delete(&self, thread_id: &str) -> Result<()> {
        let query = format!(
            "DELETE FROM {}.checkpoints WHERE thread_id = ?",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(query, (thread_id,))
            .await
            .map_err(|e| Error::from(PersistenceError::Query(e.to_string())))?;

        Ok(())
    }
}
