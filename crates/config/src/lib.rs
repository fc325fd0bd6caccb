//! Process-wide configuration: layered file + environment settings and
//! centralized constants (§6 Configuration).

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, AuthConfig, ChunkingConfig, GuardrailConfig, LlmConfig, ObservabilityConfig,
    PersistenceConfig, RateLimitConfig, RetrievalConfig, RuntimeEnvironment, ServerConfig,
    Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for docqa_core::Error {
    fn from(err: ConfigError) -> Self {
        docqa_core::Error::Config(err.to_string())
    }
}
