//! Process-wide settings, loaded from files and environment (§6 Configuration).

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{endpoints, pipeline, retrieval};
use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub guardrails: GuardrailConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Consumed only by the out-of-scope ingestion path; surfaced here for
    /// parity with the other recognised environment keys (§6).
    #[serde(default)]
    pub chunking: ChunkingConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_retrieval()?;
        self.validate_llm()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if self.server.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_connections".to_string(),
                message: "Max connections must be at least 1".to_string(),
            });
        }

        let rate_limit = &self.server.rate_limit;
        if rate_limit.enabled && rate_limit.requests_per_second == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.rate_limit.requests_per_second".to_string(),
                message: "Must be at least 1 when rate limiting is enabled".to_string(),
            });
        }

        if self.environment.is_production()
            && self.server.auth.enabled
            && self.server.auth.api_key.is_none()
        {
            return Err(ConfigError::InvalidValue {
                field: "server.auth.api_key".to_string(),
                message: "API key must be set when auth is enabled in production".to_string(),
            });
        }

        if self.environment.is_production()
            && self.server.cors_enabled
            && self.server.cors_origins.is_empty()
        {
            tracing::warn!(
                "CORS is enabled in production but no origins are configured; \
                 this may block legitimate requests"
            );
        }

        Ok(())
    }

    fn validate_retrieval(&self) -> Result<(), ConfigError> {
        let retrieval = &self.retrieval;

        if !(0.0..=1.0).contains(&retrieval.dense_weight) {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.dense_weight".to_string(),
                message: format!("Must be between 0.0 and 1.0, got {}", retrieval.dense_weight),
            });
        }

        if !(0.0..=1.0).contains(&retrieval.min_score) {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.min_score".to_string(),
                message: format!("Must be between 0.0 and 1.0, got {}", retrieval.min_score),
            });
        }

        if retrieval.rrf_k <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.rrf_k".to_string(),
                message: format!("Must be positive, got {}", retrieval.rrf_k),
            });
        }

        if retrieval.rerank_top_k == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.rerank_top_k".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if retrieval.prefetch_limit < retrieval.top_k {
            tracing::warn!(
                "retrieval.prefetch_limit ({}) is smaller than retrieval.top_k ({}); \
                 fusion will see fewer candidates than requested",
                retrieval.prefetch_limit,
                retrieval.top_k
            );
        }

        if retrieval.embedding_dim == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.embedding_dim".to_string(),
                message: "Must be nonzero".to_string(),
            });
        }

        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        if !matches!(self.llm.provider.as_str(), "claude" | "openai" | "ollama") {
            return Err(ConfigError::InvalidValue {
                field: "llm.provider".to_string(),
                message: format!(
                    "Must be one of claude, openai, ollama; got '{}'",
                    self.llm.provider
                ),
            });
        }

        if self.llm.max_retries > 10 {
            return Err(ConfigError::InvalidValue {
                field: "llm.max_retries".to_string(),
                message: "Unreasonably high retry count".to_string(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_connections: default_max_connections(),
            request_timeout_secs: default_request_timeout_secs(),
            cors_enabled: default_true(),
            cors_origins: Vec::new(),
            rate_limit: RateLimitConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    #[serde(default = "default_burst_multiplier")]
    pub burst_multiplier: f32,
}

fn default_requests_per_second() -> u32 {
    50
}

fn default_burst_multiplier() -> f32 {
    2.0
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: default_requests_per_second(),
            burst_multiplier: default_burst_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

fn default_public_paths() -> Vec<String> {
    vec!["/health".to_string(), "/metrics".to_string()]
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            public_paths: default_public_paths(),
        }
    }
}

/// Retrieval and reranking tuning (§6: `EMBEDDING_DIM`, `RETRIEVAL_TOP_K`,
/// `RETRIEVAL_PREFETCH_LIMIT`, `RERANK_TOP_K`, `RRF_K`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_qdrant_endpoint")]
    pub qdrant_endpoint: String,

    #[serde(default = "default_qdrant_collection")]
    pub qdrant_collection: String,

    #[serde(default)]
    pub qdrant_api_key: Option<String>,

    #[serde(default = "default_embedding_service_endpoint")]
    pub embedding_service_endpoint: String,

    #[serde(default = "default_reranker_service_endpoint")]
    pub reranker_service_endpoint: String,

    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    #[serde(default = "default_embedding_model_id")]
    pub embedding_model_id: String,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_prefetch_limit")]
    pub prefetch_limit: usize,

    #[serde(default = "default_rerank_top_k")]
    pub rerank_top_k: usize,

    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,

    #[serde(default = "default_dense_weight")]
    pub dense_weight: f32,

    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

fn default_qdrant_endpoint() -> String {
    endpoints::QDRANT_DEFAULT.clone()
}
fn default_qdrant_collection() -> String {
    "document_knowledge".to_string()
}
fn default_embedding_service_endpoint() -> String {
    endpoints::EMBEDDING_SERVICE_DEFAULT.clone()
}
fn default_reranker_service_endpoint() -> String {
    endpoints::RERANKER_SERVICE_DEFAULT.clone()
}
fn default_embedding_dim() -> usize {
    768
}
fn default_embedding_model_id() -> String {
    "multilingual-e5-base".to_string()
}
fn default_top_k() -> usize {
    retrieval::DEFAULT_TOP_K
}
fn default_prefetch_limit() -> usize {
    retrieval::DEFAULT_PREFETCH_LIMIT
}
fn default_rerank_top_k() -> usize {
    retrieval::DEFAULT_RERANK_TOP_K
}
fn default_rrf_k() -> f32 {
    retrieval::DEFAULT_RRF_K
}
fn default_dense_weight() -> f32 {
    retrieval::DEFAULT_DENSE_WEIGHT
}
fn default_min_score() -> f32 {
    retrieval::DEFAULT_MIN_SCORE
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            qdrant_endpoint: default_qdrant_endpoint(),
            qdrant_collection: default_qdrant_collection(),
            qdrant_api_key: None,
            embedding_service_endpoint: default_embedding_service_endpoint(),
            reranker_service_endpoint: default_reranker_service_endpoint(),
            embedding_dim: default_embedding_dim(),
            embedding_model_id: default_embedding_model_id(),
            top_k: default_top_k(),
            prefetch_limit: default_prefetch_limit(),
            rerank_top_k: default_rerank_top_k(),
            rrf_k: default_rrf_k(),
            dense_weight: default_dense_weight(),
            min_score: default_min_score(),
        }
    }
}

/// `LLM_PROVIDER ∈ {claude, openai, ollama}` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_llm_provider() -> String {
    std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "ollama".to_string())
}
fn default_llm_model() -> String {
    "claude-4".to_string()
}
fn default_max_retries() -> u32 {
    pipeline::MAX_RETRIES
}
fn default_temperature() -> f32 {
    0.2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            endpoint: None,
            api_key: None,
            max_retries: default_max_retries(),
            temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailConfig {
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,

    #[serde(default)]
    pub strict_output_guardrails: bool,
}

fn default_max_query_length() -> usize {
    pipeline::MAX_QUERY_LENGTH
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            max_query_length: default_max_query_length(),
            strict_output_guardrails: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_metrics_port() -> u16 {
    9090
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: true,
            metrics_enabled: true,
            metrics_port: default_metrics_port(),
        }
    }
}

/// ScyllaDB checkpoint backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_scylla_hosts")]
    pub scylla_hosts: Vec<String>,

    #[serde(default = "default_scylla_keyspace")]
    pub keyspace: String,

    #[serde(default = "default_replication_factor")]
    pub replication_factor: u8,
}

fn default_scylla_hosts() -> Vec<String> {
    std::env::var("SCYLLA_HOSTS")
        .map(|s| s.split(',').map(|h| h.trim().to_string()).collect())
        .unwrap_or_else(|_| vec!["127.0.0.1:9042".to_string()])
}

fn default_scylla_keyspace() -> String {
    std::env::var("SCYLLA_KEYSPACE").unwrap_or_else(|_| "docqa".to_string())
}

fn default_replication_factor() -> u8 {
    1
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scylla_hosts: default_scylla_hosts(),
            keyspace: default_scylla_keyspace(),
            replication_factor: default_replication_factor(),
        }
    }
}

/// Surfaced for parity with the ingestion path's `CHUNK_SIZE`/`CHUNK_OVERLAP`
/// keys (§6); the core never reads these itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    512
}
fn default_chunk_overlap() -> usize {
    64
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_max_connections() -> usize {
    1000
}
fn default_request_timeout_secs() -> u64 {
    crate::constants::timeouts::REQUEST_DEADLINE_SECS
}
fn default_true() -> bool {
    true
}

/// Load settings from files and environment.
///
/// Priority (highest to lowest): environment variables (`DOCQA__` prefix,
/// `__` separator), `config/{env}.yaml`, `config/default.yaml`.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("DOCQA")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn retrieval_dense_weight_out_of_range_is_rejected() {
        let mut settings = Settings::default();
        settings.retrieval.dense_weight = 1.5;
        assert!(settings.validate_retrieval().is_err());
        settings.retrieval.dense_weight = -0.1;
        assert!(settings.validate_retrieval().is_err());
    }

    #[test]
    fn rerank_top_k_zero_is_rejected() {
        let mut settings = Settings::default();
        settings.retrieval.rerank_top_k = 0;
        assert!(settings.validate_retrieval().is_err());
    }

    #[test]
    fn unknown_llm_provider_is_rejected() {
        let mut settings = Settings::default();
        settings.llm.provider = "azure".to_string();
        assert!(settings.validate_llm().is_err());
    }

    #[test]
    fn production_auth_requires_api_key() {
        let mut settings = Settings::default();
        settings.environment = RuntimeEnvironment::Production;
        settings.server.auth.enabled = true;
        settings.server.auth.api_key = None;
        assert!(settings.validate_server().is_err());

        settings.server.auth.api_key = Some("secret".to_string());
        assert!(settings.validate_server().is_ok());
    }

    #[test]
    fn port_zero_is_rejected() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate_server().is_err());
    }
}
