pub mod chunker;
pub mod embedding;
pub mod indexer;
pub mod language;
pub mod loader;
pub mod pipeline;
pub mod qa;
pub mod retriever;
pub mod vector_store;

pub use chunker::CodeChunker;
pub use embedding::{EmbeddingProvider, HealthResponse, HttpEmbeddingClient};
pub use indexer::{BuildReport, IndexBuilder};
pub use language::LanguageProfile;
pub use loader::load_content;
pub use pipeline::{EmbeddingPipeline, PipelineOptions, PipelineReport};
pub use qa::{Answer, AnswerGenerator, ChatCompletionClient, QaEngine};
pub use retriever::Retriever;
pub use vector_store::{CollectionInfo, IndexHandle, VectorIndex, VectorStore};
