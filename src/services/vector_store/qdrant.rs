//! Qdrant vector store backend implementation.

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value, VectorParamsBuilder,
};
use std::collections::HashMap;
use uuid::Uuid;

use super::{CollectionInfo, VectorStore};
use crate::error::VectorStoreError;
use crate::models::{Chunk, IndexRecord, SearchHit, VectorStoreConfig};

/// Qdrant vector store backend.
pub struct QdrantBackend {
    client: Qdrant,
    collection: String,
    embedding_dim: u64,
}

impl QdrantBackend {
    /// Create a new Qdrant backend from configuration.
    pub fn new(config: &VectorStoreConfig, embedding_dim: u64) -> Result<Self, VectorStoreError> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            embedding_dim,
        })
    }

    /// Qdrant only accepts integer or UUID point ids.
    pub fn point_id(record_id: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, record_id.as_bytes()).to_string()
    }

    fn payload(record: IndexRecord) -> HashMap<String, Value> {
        let meta = record.metadata;
        let mut payload: HashMap<String, Value> = HashMap::new();
        payload.insert("record_id".to_string(), record.id.into());
        payload.insert("path".to_string(), meta.path.into());
        payload.insert("chunk_id".to_string(), i64::from(meta.chunk_id).into());
        payload.insert("text".to_string(), record.text.into());
        payload.insert("start_line".to_string(), i64::from(meta.start_line).into());
        payload.insert("end_line".to_string(), i64::from(meta.end_line).into());
        payload.insert("kind".to_string(), meta.kind.as_str().into());
        payload
    }

    fn chunk_from_payload(payload: &HashMap<String, Value>) -> Chunk {
        let string = |key: &str| match payload.get(key).and_then(|v| v.kind.as_ref()) {
            Some(Kind::StringValue(s)) => s.clone(),
            _ => String::new(),
        };
        let int = |key: &str| match payload.get(key).and_then(|v| v.kind.as_ref()) {
            Some(Kind::IntegerValue(n)) => u32::try_from(*n).unwrap_or(0),
            _ => 0,
        };

        Chunk {
            path: string("path"),
            chunk_id: int("chunk_id"),
            text: string("text"),
            start_line: int("start_line"),
            end_line: int("end_line"),
            kind: string("kind").parse().unwrap_or_default(),
        }
    }
}

#[async_trait]
impl VectorStore for QdrantBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.client
            .health_check()
            .await
            .map(|_| true)
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))
    }

    async fn get_collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError> {
        match self.client.collection_info(&self.collection).await {
            Ok(info) => Ok(Some(CollectionInfo {
                points_count: info.result.map_or(0, |r| r.points_count.unwrap_or(0)),
            })),
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("not found") || msg.contains("doesn't exist") {
                    Ok(None)
                } else {
                    Err(VectorStoreError::CollectionError(msg))
                }
            }
        }
    }

    async fn create_collection(&self) -> Result<(), VectorStoreError> {
        if self.get_collection_info().await?.is_some() {
            return Ok(());
        }

        let create_collection = CreateCollectionBuilder::new(&self.collection).vectors_config(
            VectorParamsBuilder::new(self.embedding_dim, Distance::Cosine),
        );

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        Ok(())
    }

    async fn delete_collection(&self) -> Result<(), VectorStoreError> {
        self.client
            .delete_collection(&self.collection)
            .await
            .map_err(|e| VectorStoreError::DeleteError(e.to_string()))?;
        Ok(())
    }

    async fn upsert_records(&self, records: Vec<IndexRecord>) -> Result<(), VectorStoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = records
            .into_iter()
            .map(|mut record| {
                let id = Self::point_id(&record.id);
                let vector = std::mem::take(&mut record.vector);
                PointStruct::new(id, vector, Self::payload(record))
            })
            .collect();

        let upsert = UpsertPointsBuilder::new(&self.collection, points).wait(true);

        self.client
            .upsert_points(upsert)
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        limit: u64,
    ) -> Result<Vec<SearchHit>, VectorStoreError> {
        let search = SearchPointsBuilder::new(&self.collection, query_vector.to_vec(), limit)
            .with_payload(true);

        let results = self
            .client
            .search_points(search)
            .await
            .map_err(|e| VectorStoreError::SearchError(e.to_string()))?;

        Ok(results
            .result
            .into_iter()
            .map(|point| SearchHit {
                chunk: Self::chunk_from_payload(&point.payload),
                // Cosine collections score by similarity.
                distance: 1.0 - point.score,
            })
            .collect())
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChunkKind, RecordMetadata};

    #[test]
    fn test_point_id_is_stable_uuid() {
        let a = QdrantBackend::point_id("src/main.rs_0");
        assert_eq!(a, QdrantBackend::point_id("src/main.rs_0"));
        assert_ne!(a, QdrantBackend::point_id("src/main.rs_1"));
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn test_payload_round_trip() {
        let record = IndexRecord {
            id: "lib.go_3".to_string(),
            vector: vec![0.5; 4],
            text: "func main() {}".to_string(),
            metadata: RecordMetadata {
                path: "lib.go".to_string(),
                chunk_id: 3,
                start_line: 10,
                end_line: 24,
                kind: ChunkKind::LargeBlockSplit,
            },
        };
        let expected = record.to_chunk();

        let payload = QdrantBackend::payload(record);
        assert_eq!(QdrantBackend::chunk_from_payload(&payload), expected);
    }
}
