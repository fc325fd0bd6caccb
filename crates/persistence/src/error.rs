//! Persistence errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<PersistenceError> for docqa_core::Error {
    fn from(err: PersistenceError) -> Self {
        docqa_core::Error::Persistence(err.to_string())
    }
}
