//! Error types for repoqa.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding server: {0}")]
    ConnectionError(String),

    #[error("embedding provider rate limited the request: {0}")]
    RateLimited(String),

    #[error("embedding provider rejected credentials: {0}")]
    Unauthorized(String),

    #[error("embedding server error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,
}

impl EmbeddingError {
    /// Errors after which no further chunk can succeed either.
    ///
    /// A fatal error aborts the whole index build instead of skipping a chunk.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EmbeddingError::Unauthorized(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, EmbeddingError::RateLimited(_))
    }
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::RateLimited(_) | EmbeddingError::Timeout => true,
            EmbeddingError::RequestError(e) => e.is_timeout(),
            EmbeddingError::ConnectionError(_)
            | EmbeddingError::Unauthorized(_)
            | EmbeddingError::ServerError(_)
            | EmbeddingError::InvalidResponse(_) => false,
        }
    }
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to vector store: {0}")]
    ConnectionError(String),

    #[error("collection error: {0}")]
    CollectionError(String),

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("search error: {0}")]
    SearchError(String),

    #[error("delete error: {0}")]
    DeleteError(String),

    #[error("PostgreSQL error: {0}")]
    PostgresError(String),

    #[error("pgvector extension error: {0}")]
    PgVectorExtensionError(String),

    #[error("vector dimension mismatch: index holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors related to building an index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("embedding error: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStoreError(#[from] VectorStoreError),

    #[error("source error: {0}")]
    SourceError(#[from] SourceError),

    #[error("no files found")]
    NoFilesFound,
}

/// Errors related to retrieval and answering.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("vector store error: {0}")]
    VectorStoreError(#[from] VectorStoreError),

    #[error("answer generation failed: {0}")]
    LlmError(#[from] LlmError),

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Errors raised by the answer-generation collaborator.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing API key for model {0}")]
    MissingApiKey(String),

    #[error("chat completion request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("chat completion server error: {0}")]
    ServerError(String),

    #[error("invalid chat completion response: {0}")]
    InvalidResponse(String),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors related to reading a repository from disk.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("path does not exist: {0}")]
    NotFound(String),

    #[error("invalid exclude pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("search error: {0}")]
    Search(#[from] SearchError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("{0}")]
    Other(String),
}
