//! ScyllaDB schema for checkpointed session state (§4.10, §6).

use scylla::Session;

use crate::error::PersistenceError;

pub async fn create_keyspace(session: &Session, keyspace: &str, replication_factor: u8) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    );

    session
        .query_unpaged(query, &[])
        .await
        .map_err(|e| PersistenceError::Schema(format!("failed to create keyspace: {}", e)))?;

    Ok(())
}

/// A session record is opaque JSON to the core (§6: "session records are
/// opaque to the core"); the persistence crate owns the column layout.
pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    let checkpoints_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.checkpoints (
            thread_id TEXT PRIMARY KEY,
            revision BIGINT,
            session_json TEXT,
            updated_at TIMESTAMP
        )
        "#,
        keyspace
    );

    session
        .query_unpaged(checkpoints_table, &[])
        .await
        .map_err(|e| PersistenceError::Schema(format!("failed to create checkpoints table: {}", e)))?;

    tracing::info!(keyspace = %keyspace, "checkpoint schema ensured");
    Ok(())
}
