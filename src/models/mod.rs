mod chunk;
mod config;
mod search;

pub use chunk::{
    Chunk, ChunkFragment, ChunkKind, IndexRecord, RecordMetadata, SourceFile, record_id,
};
pub use config::{
    Config, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_QDRANT_URL, EmbeddingConfig,
    IndexingConfig, LlmConfig, PipelineConfig, SearchConfig, VectorDriver, VectorStoreConfig,
};
pub use search::{OutputFormat, SearchHit, SearchResults};
