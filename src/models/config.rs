use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::search::OutputFormat;
use crate::error::ConfigError;
use crate::utils::retry::RetryConfig;

pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:11411";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "codebase";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1024;
pub const DEFAULT_LLM_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

pub const EMBEDDING_API_KEY_ENV: &str = "REPOQA_EMBEDDING_API_KEY";
pub const VECTOR_API_KEY_ENV: &str = "REPOQA_VECTOR_API_KEY";
pub const LLM_API_KEY_ENV: &str = "REPOQA_LLM_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub llm: LlmConfig,
}

impl Config {
    pub fn config_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join("repoqa").join("config.toml"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(&path)?;
                toml::from_str(&content)?
            }
            _ => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<std::path::PathBuf, ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Fill API keys missing from the file from the environment (and `.env`).
    pub fn apply_env(&mut self) {
        fn fill(slot: &mut Option<String>, var: &str) {
            if slot.is_none()
                && let Ok(value) = std::env::var(var)
                && !value.trim().is_empty()
            {
                *slot = Some(value);
            }
        }

        fill(&mut self.embedding.api_key, EMBEDDING_API_KEY_ENV);
        fill(&mut self.vector_store.api_key, VECTOR_API_KEY_ENV);
        fill(&mut self.llm.api_key, LLM_API_KEY_ENV);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (self.indexing.chunk_size == 0, "indexing.chunk_size must be > 0"),
            (self.pipeline.batch_size == 0, "pipeline.batch_size must be > 0"),
            (self.pipeline.concurrency == 0, "pipeline.concurrency must be > 0"),
            (self.pipeline.max_attempts == 0, "pipeline.max_attempts must be > 0"),
            (
                self.pipeline
                    .retry_backoff_multiplier
                    .is_some_and(|m| !m.is_finite() || m < 1.0),
                "pipeline.retry_backoff_multiplier must be >= 1.0",
            ),
            (self.embedding.dimension == 0, "embedding.dimension must be > 0"),
            (self.search.default_limit == 0, "search.default_limit must be > 0"),
        ];

        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(ConfigError::ValidationError((*message).to_string())),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Dimensionality of every vector the provider returns.
    #[serde(default = "default_dimension")]
    pub dimension: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_embedding_url() -> String {
    DEFAULT_EMBEDDING_URL.to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            timeout_secs: default_timeout(),
            dimension: default_dimension(),
            api_key: None,
        }
    }
}

/// Vector store backend driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorDriver {
    /// In-process store; lives only as long as the process.
    Memory,
    #[default]
    Qdrant,
    #[serde(alias = "postgres")]
    PostgreSQL,
}

impl std::fmt::Display for VectorDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorDriver::Memory => write!(f, "memory"),
            VectorDriver::Qdrant => write!(f, "qdrant"),
            VectorDriver::PostgreSQL => write!(f, "postgresql"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub driver: VectorDriver,

    #[serde(default = "default_qdrant_url")]
    pub url: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// PostgreSQL schema holding the collection table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default = "default_pool_max")]
    pub pool_max: u32,

    #[serde(default = "default_pool_acquire_timeout")]
    pub pool_acquire_timeout: u32,
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_pool_max() -> u32 {
    5
}

fn default_pool_acquire_timeout() -> u32 {
    30
}

impl VectorStoreConfig {
    /// Table name, qualified by schema when one is configured.
    pub fn qualified_table_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.collection),
            None => self.collection.clone(),
        }
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            driver: VectorDriver::default(),
            url: default_qdrant_url(),
            collection: default_collection(),
            api_key: None,
            schema: None,
            pool_max: default_pool_max(),
            pool_acquire_timeout: default_pool_acquire_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Maximum chunk length in bytes, header context included.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Descend into symlinked directories and index symlinked files.
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/*.min.js".to_string(),
        "**/*.min.css".to_string(),
        "**/package-lock.json".to_string(),
        "**/yarn.lock".to_string(),
        "**/pnpm-lock.yaml".to_string(),
    ]
}

fn default_extensions() -> Vec<String> {
    [
        "py", "js", "ts", "tsx", "java", "go", "cs", "php", "rb", "rs", "cpp", "c", "h", "hpp",
        "md", "txt", "rst", "yaml", "yml", "ipynb", "pdf",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_chunk_size() -> u32 {
    1200
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: default_exclude_patterns(),
            extensions: default_extensions(),
            max_file_size: default_max_file_size(),
            chunk_size: default_chunk_size(),
            follow_symlinks: false,
        }
    }
}

/// Embedding pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Embedded chunks written to the index per flush.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Embedding calls allowed in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Pause after every embedding call, whatever its outcome.
    #[serde(default = "default_call_delay_ms")]
    pub call_delay_ms: u64,

    /// Attempts per chunk when the provider rate limits, first call included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Grow the retry delay by this factor per attempt; fixed delay when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_backoff_multiplier: Option<f64>,

    /// Cap for a single retry delay under exponential backoff.
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
}

fn default_batch_size() -> u32 {
    32
}

fn default_concurrency() -> u32 {
    4
}

fn default_call_delay_ms() -> u64 {
    100
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_max_retry_delay_ms() -> u64 {
    10_000
}

impl PipelineConfig {
    pub fn retry(&self) -> RetryConfig {
        let fixed = RetryConfig::fixed(
            self.max_attempts,
            Duration::from_millis(self.retry_delay_ms),
        );
        match self.retry_backoff_multiplier {
            Some(multiplier) if multiplier > 1.0 => fixed.with_exponential(
                multiplier,
                Duration::from_millis(self.max_retry_delay_ms.max(self.retry_delay_ms)),
            ),
            _ => fixed,
        }
    }

    pub fn call_delay(&self) -> Duration {
        Duration::from_millis(self.call_delay_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            call_delay_ms: default_call_delay_ms(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            retry_backoff_multiplier: None,
            max_retry_delay_ms: default_max_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    #[serde(default)]
    pub default_format: OutputFormat,
}

fn default_limit() -> u32 {
    8
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_format: OutputFormat::Text,
        }
    }
}

/// Chat-completions endpoint used to answer questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_url() -> String {
    DEFAULT_LLM_URL.to_string()
}

fn default_llm_model() -> String {
    DEFAULT_LLM_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.3
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_url(),
            model: default_llm_model(),
            api_key: None,
            temperature: default_temperature(),
            timeout_secs: default_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::retry::Backoff;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.embedding.url, DEFAULT_EMBEDDING_URL);
        assert_eq!(config.vector_store.url, DEFAULT_QDRANT_URL);
        assert_eq!(config.vector_store.collection, DEFAULT_COLLECTION);
        assert_eq!(config.vector_store.driver, VectorDriver::Qdrant);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path();
        assert!(path.is_some());
    }

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.retry().max_attempts, 3);
        assert_eq!(config.call_delay(), Duration::from_millis(100));
        assert_eq!(config.retry().backoff, Backoff::Fixed);
    }

    #[test]
    fn test_pipeline_exponential_backoff() {
        let config: Config = toml::from_str(
            r#"
            [pipeline]
            retry_delay_ms = 1000
            retry_backoff_multiplier = 2.0
            max_retry_delay_ms = 3000
            "#,
        )
        .unwrap();
        assert!(config.validate().is_ok());

        let retry = config.pipeline.retry();
        assert_eq!(retry.backoff, Backoff::Exponential { multiplier: 2.0 });
        assert_eq!(retry.delay_after(1), Duration::from_millis(1000));
        assert_eq!(retry.delay_after(2), Duration::from_millis(2000));
        assert_eq!(retry.delay_after(3), Duration::from_millis(3000));

        let mut config = Config::default();
        config.pipeline.retry_backoff_multiplier = Some(0.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [vector_store]
            driver = "memory"

            [indexing]
            chunk_size = 800
            "#,
        )
        .unwrap();

        assert_eq!(config.vector_store.driver, VectorDriver::Memory);
        assert_eq!(config.vector_store.collection, DEFAULT_COLLECTION);
        assert_eq!(config.indexing.chunk_size, 800);
        assert!(config.indexing.extensions.contains(&"py".to_string()));
        assert_eq!(config.search.default_limit, 8);
    }

    #[test]
    fn test_postgres_alias() {
        let config: VectorStoreConfig = toml::from_str("driver = \"postgres\"").unwrap();
        assert_eq!(config.driver, VectorDriver::PostgreSQL);
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let mut config = Config::default();
        config.pipeline.batch_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_qualified_table_name() {
        let mut config = VectorStoreConfig::default();
        assert_eq!(config.qualified_table_name(), DEFAULT_COLLECTION);
        config.schema = Some("rag".to_string());
        assert_eq!(config.qualified_table_name(), "rag.codebase");
    }
}
