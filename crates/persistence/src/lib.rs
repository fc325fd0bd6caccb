//! ScyllaDB-backed checkpoint store implementing the core `CheckpointBackend`
//! seam (§4.10 Session Store, §6 checkpoint backend contract).

pub mod checkpoint_store;
pub mod client;
pub mod error;
pub mod schema;

pub use checkpoint_store::ScyllaCheckpointStore;
pub use client::{ScyllaClient, ScyllaConfig};
pub use error::PersistenceError;

use docqa_config::PersistenceConfig;

/// Connects to ScyllaDB, ensures the checkpoint schema exists, and returns a
/// ready-to-use `CheckpointBackend`.
pub async fn init(config: &PersistenceConfig) -> Result<ScyllaCheckpointStore, PersistenceError> {
    let scylla_config = ScyllaConfig {
        hosts: config.scylla_hosts.clone(),
        keyspace: config.keyspace.clone(),
        replication_factor: config.replication_factor,
    };

    let client = ScyllaClient::connect(scylla_config).await?;
    client.ensure_schema().await?;

    Ok(ScyllaCheckpointStore::new(client))
}
