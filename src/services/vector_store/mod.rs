//! Vector store abstraction layer.
//!
//! Backends (in-process, Qdrant, PostgreSQL/pgvector) implement [`VectorStore`].
//! [`VectorIndex`] wraps one backend with the index contract: constant
//! dimensionality, serialized writes, a `clear` that always leaves the
//! collection usable, and searches that degrade to empty results.

mod memory;
mod pgvector;
mod qdrant;

pub use memory::{MemoryBackend, cosine_similarity};
pub use pgvector::PgVectorBackend;
pub use qdrant::QdrantBackend;

use async_trait::async_trait;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::VectorStoreError;
use crate::models::{IndexRecord, SearchHit, VectorDriver, VectorStoreConfig};

/// Collection/table information
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub points_count: u64,
}

/// Abstract trait for vector store operations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check if the vector store is healthy and accessible.
    async fn health_check(&self) -> Result<bool, VectorStoreError>;

    /// Get information about the current collection/table.
    /// Returns None if the collection doesn't exist.
    async fn get_collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError>;

    /// Create the collection/table if it doesn't exist.
    async fn create_collection(&self) -> Result<(), VectorStoreError>;

    /// Drop the collection/table and everything in it.
    async fn delete_collection(&self) -> Result<(), VectorStoreError>;

    /// Insert records, replacing any with the same id.
    async fn upsert_records(&self, records: Vec<IndexRecord>) -> Result<(), VectorStoreError>;

    /// Nearest records by cosine distance, closest first.
    async fn search(
        &self,
        query_vector: &[f32],
        limit: u64,
    ) -> Result<Vec<SearchHit>, VectorStoreError>;

    /// Get the collection/table name.
    fn collection(&self) -> &str;
}

/// Create a vector store backend for the configured driver.
pub async fn create_backend(
    config: &VectorStoreConfig,
    embedding_dim: u64,
) -> Result<Box<dyn VectorStore>, VectorStoreError> {
    match config.driver {
        VectorDriver::Memory => Ok(Box::new(MemoryBackend::new(&config.collection))),
        VectorDriver::Qdrant => {
            let backend = QdrantBackend::new(config, embedding_dim)?;
            Ok(Box::new(backend))
        }
        VectorDriver::PostgreSQL => {
            let backend = PgVectorBackend::new(config, embedding_dim).await?;
            Ok(Box::new(backend))
        }
    }
}

/// The vector index for the active repository.
pub struct VectorIndex {
    backend: Box<dyn VectorStore>,
    dimension: usize,
    /// Held exclusively by writers; `clear` and `add` never interleave.
    gate: RwLock<()>,
}

impl fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorIndex")
            .field("collection", &self.backend.collection())
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    pub fn new(backend: Box<dyn VectorStore>, dimension: usize) -> Self {
        Self {
            backend,
            dimension,
            gate: RwLock::new(()),
        }
    }

    /// Connect to the configured backend.
    pub async fn connect(
        config: &VectorStoreConfig,
        dimension: u32,
    ) -> Result<Self, VectorStoreError> {
        let backend = create_backend(config, u64::from(dimension)).await?;
        Ok(Self::new(backend, dimension as usize))
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn collection(&self) -> &str {
        self.backend.collection()
    }

    pub async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.backend.health_check().await
    }

    /// Create the collection if it is missing.
    pub async fn ensure_collection(&self) -> Result<(), VectorStoreError> {
        let _guard = self.gate.write().await;
        self.backend.create_collection().await
    }

    /// Remove every record and leave an empty, queryable collection.
    ///
    /// Failing to delete a collection that does not exist is not an error.
    pub async fn clear(&self) -> Result<(), VectorStoreError> {
        let _guard = self.gate.write().await;

        if let Err(e) = self.backend.delete_collection().await {
            debug!(collection = self.backend.collection(), error = %e, "delete before clear failed");
        }

        self.backend.create_collection().await
    }

    /// Store records; ids already present are overwritten.
    pub async fn add(&self, records: Vec<IndexRecord>) -> Result<(), VectorStoreError> {
        if records.is_empty() {
            return Ok(());
        }

        if let Some(bad) = records.iter().find(|r| r.vector.len() != self.dimension) {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.vector.len(),
            });
        }

        let _guard = self.gate.write().await;
        self.backend.upsert_records(records).await
    }

    /// Up to `top_k` hits by ascending cosine distance.
    ///
    /// Backend failures yield an empty result; only a query vector of the
    /// wrong dimensionality is reported as an error.
    pub async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, VectorStoreError> {
        if query_vector.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: query_vector.len(),
            });
        }

        if top_k == 0 {
            return Ok(Vec::new());
        }

        let _guard = self.gate.read().await;
        match self.backend.search(query_vector, top_k as u64).await {
            Ok(hits) => Ok(hits),
            Err(e) => {
                warn!(collection = self.backend.collection(), error = %e, "vector search failed");
                Ok(Vec::new())
            }
        }
    }

    /// Number of stored records, 0 when the collection does not exist.
    pub async fn count(&self) -> Result<u64, VectorStoreError> {
        Ok(self
            .backend
            .get_collection_info()
            .await?
            .map_or(0, |info| info.points_count))
    }
}

/// Owned handle to the active index, passed into and returned by index builds.
#[derive(Debug, Clone)]
pub struct IndexHandle(Arc<VectorIndex>);

impl IndexHandle {
    pub fn new(index: VectorIndex) -> Self {
        Self(Arc::new(index))
    }
}

impl Deref for IndexHandle {
    type Target = VectorIndex;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
