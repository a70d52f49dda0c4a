//! Query-time retrieval: embed a question, rank chunks from the index.

use std::sync::Arc;
use tracing::{debug, warn};

use super::embedding::EmbeddingProvider;
use super::vector_store::IndexHandle;
use crate::error::SearchError;
use crate::models::{Chunk, SearchHit};

pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    index: IndexHandle,
}

impl Retriever {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, index: IndexHandle) -> Self {
        Self { provider, index }
    }

    pub fn index(&self) -> &IndexHandle {
        &self.index
    }

    /// Top `top_k` hits for `query` with their distances, closest first.
    ///
    /// A query that cannot be embedded yields no hits.
    pub async fn retrieve_scored(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidQuery("query is empty".to_string()));
        }

        let vector = match self.provider.embed_query(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "query embedding failed");
                return Ok(Vec::new());
            }
        };

        let hits = self.index.search(&vector, top_k).await?;
        for hit in &hits {
            debug!(
                record = %hit.chunk.record_id(),
                distance = hit.distance,
                "retrieved"
            );
        }
        Ok(hits)
    }

    /// Top `top_k` chunks for `query`, closest first.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Chunk>, SearchError> {
        Ok(self
            .retrieve_scored(query, top_k)
            .await?
            .into_iter()
            .map(|hit| hit.chunk)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EmbeddingError, VectorStoreError};
    use crate::models::{ChunkKind, IndexRecord};
    use crate::services::vector_store::{MemoryBackend, VectorIndex};
    use async_trait::async_trait;

    /// Maps known words to fixed unit vectors.
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        async fn embed_document(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.embed_query(text).await
        }

        async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text.contains("offline") {
                return Err(EmbeddingError::ConnectionError("refused".to_string()));
            }
            if text.contains("wide") {
                return Ok(vec![1.0, 0.0, 0.0, 0.0]);
            }
            Ok(match text {
                t if t.contains("parse") => vec![1.0, 0.0, 0.0],
                t if t.contains("render") => vec![0.0, 1.0, 0.0],
                _ => vec![0.0, 0.0, 1.0],
            })
        }
    }

    async fn seeded() -> Retriever {
        let index = IndexHandle::new(VectorIndex::new(Box::new(MemoryBackend::new("t")), 3));
        index.clear().await.unwrap();

        let records = [
            ("parser.rs", "fn parse()", vec![1.0, 0.0, 0.0]),
            ("render.rs", "fn render()", vec![0.0, 1.0, 0.0]),
            ("mixed.rs", "fn parse_and_render()", vec![0.7, 0.7, 0.0]),
        ]
        .into_iter()
        .map(|(path, text, vector)| {
            IndexRecord::from_chunk(
                Chunk {
                    path: path.to_string(),
                    chunk_id: 0,
                    text: text.to_string(),
                    start_line: 1,
                    end_line: 3,
                    kind: ChunkKind::Logical,
                },
                vector,
            )
        })
        .collect();
        index.add(records).await.unwrap();

        Retriever::new(Arc::new(KeywordEmbedder), index)
    }

    #[tokio::test]
    async fn test_retrieve_ranks_by_similarity() {
        let retriever = seeded().await;
        let chunks = retriever.retrieve("how do we parse input", 2).await.unwrap();
        let paths: Vec<&str> = chunks.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["parser.rs", "mixed.rs"]);
    }

    #[tokio::test]
    async fn test_scored_hits_are_ascending_distance() {
        let retriever = seeded().await;
        let hits = retriever.retrieve_scored("render", 3).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert!((hits[0].similarity() - 1.0).abs() < 1e-6);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn test_embedding_failure_returns_empty() {
        let retriever = seeded().await;
        assert!(retriever.retrieve("offline question", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let retriever = seeded().await;
        assert!(matches!(
            retriever.retrieve("   ", 3).await,
            Err(SearchError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_reported() {
        let retriever = seeded().await;
        let err = retriever.retrieve("wide query", 3).await.unwrap_err();
        assert!(matches!(
            err,
            SearchError::VectorStoreError(VectorStoreError::DimensionMismatch { .. })
        ));
    }
}
