//! Checkpoint backend seam (§4.10, §6): the session store delegates
//! persistence to this trait; the core defines only the interface.

use async_trait::async_trait;

use crate::error::Result;
use crate::session::SessionState;

#[async_trait]
pub trait CheckpointBackend: Send + Sync {
    async fn load(&self, thread_id: &str) -> Result<Option<SessionState>>;
    async fn save(&self, thread_id: &str, state: &SessionState) -> Result<()>;
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<String>>;
    async fn delete(&self, thread_id: &str) -> Result<()>;
}
