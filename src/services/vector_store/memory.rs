//! In-process vector store with brute-force cosine search.
//!
//! Lives only as long as the process; used for one-shot sessions and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{CollectionInfo, VectorStore};
use crate::error::VectorStoreError;
use crate::models::{IndexRecord, SearchHit};

/// Cosine similarity of two vectors; 0.0 when either has zero norm or the
/// lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}

#[derive(Default)]
struct Collection {
    /// Insertion order; overwrites keep their original slot.
    records: Vec<IndexRecord>,
    slots: HashMap<String, usize>,
}

impl Collection {
    fn upsert(&mut self, record: IndexRecord) {
        match self.slots.get(&record.id) {
            Some(&slot) => self.records[slot] = record,
            None => {
                self.slots.insert(record.id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }
}

pub struct MemoryBackend {
    collection: String,
    /// `None` until the collection is created.
    state: Mutex<Option<Collection>>,
}

impl MemoryBackend {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            state: Mutex::new(None),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<Collection>>, VectorStoreError> {
        self.state
            .lock()
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))
    }
}

#[async_trait]
impl VectorStore for MemoryBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        Ok(true)
    }

    async fn get_collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError> {
        Ok(self.lock()?.as_ref().map(|c| CollectionInfo {
            points_count: c.records.len() as u64,
        }))
    }

    async fn create_collection(&self) -> Result<(), VectorStoreError> {
        self.lock()?.get_or_insert_with(Collection::default);
        Ok(())
    }

    async fn delete_collection(&self) -> Result<(), VectorStoreError> {
        match self.lock()?.take() {
            Some(_) => Ok(()),
            None => Err(VectorStoreError::CollectionError(format!(
                "collection {} does not exist",
                self.collection
            ))),
        }
    }

    async fn upsert_records(&self, records: Vec<IndexRecord>) -> Result<(), VectorStoreError> {
        let mut state = self.lock()?;
        let collection = state.as_mut().ok_or_else(|| {
            VectorStoreError::UpsertError(format!(
                "collection {} does not exist",
                self.collection
            ))
        })?;

        for record in records {
            collection.upsert(record);
        }
        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        limit: u64,
    ) -> Result<Vec<SearchHit>, VectorStoreError> {
        let state = self.lock()?;
        let Some(collection) = state.as_ref() else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(f32, &IndexRecord)> = collection
            .records
            .iter()
            .filter(|r| !r.vector.is_empty())
            .map(|r| (cosine_similarity(query_vector, &r.vector), r))
            .collect();

        // Stable sort: equal similarities keep insertion order.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(usize::try_from(limit).unwrap_or(usize::MAX));

        Ok(scored
            .into_iter()
            .map(|(similarity, record)| SearchHit {
                chunk: record.to_chunk(),
                distance: 1.0 - similarity,
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
    use crate::models::{Chunk, ChunkKind};

    fn record(id: u32, vector: Vec<f32>) -> IndexRecord {
        IndexRecord::from_chunk(
            Chunk {
                path: "f.rs".to_string(),
                chunk_id: id,
                text: format!("chunk {id}"),
                start_line: 1,
                end_line: 1,
                kind: ChunkKind::Logical,
            },
            vector,
        )
    }

    async fn backend_with(records: Vec<IndexRecord>) -> MemoryBackend {
        let backend = MemoryBackend::new("test");
        backend.create_collection().await.unwrap();
        backend.upsert_records(records).await.unwrap();
        backend
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![0.3, -1.2, 4.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_orthogonal_and_opposite() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let backend = backend_with(vec![
            record(0, vec![1.0, 0.0]),
            record(1, vec![2.0, 0.0]),
            record(2, vec![0.0, 1.0]),
            record(3, vec![3.0, 0.0]),
        ])
        .await;

        let hits = backend.search(&[1.0, 0.0], 10).await.unwrap();
        let ids: Vec<u32> = hits.iter().map(|h| h.chunk.chunk_id).collect();
        assert_eq!(ids, vec![0, 1, 3, 2]);
    }

    #[tokio::test]
    async fn test_skips_records_without_embedding() {
        let backend = backend_with(vec![record(0, vec![]), record(1, vec![1.0, 0.0])]).await;
        let hits = backend.search(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.chunk_id, 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_last_write_wins() {
        let backend = backend_with(vec![record(0, vec![1.0, 0.0]), record(1, vec![0.0, 1.0])]).await;
        let mut replacement = record(0, vec![0.0, 1.0]);
        replacement.text = "replaced".to_string();
        backend.upsert_records(vec![replacement]).await.unwrap();

        let info = backend.get_collection_info().await.unwrap().unwrap();
        assert_eq!(info.points_count, 2);

        let hits = backend.search(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(hits[0].chunk.text, "replaced");
    }

    #[tokio::test]
    async fn test_limit_truncates() {
        let backend = backend_with((0..5).map(|i| record(i, vec![1.0, i as f32])).collect()).await;
        assert_eq!(backend.search(&[1.0, 0.0], 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_collection() {
        let backend = MemoryBackend::new("test");
        assert!(backend.get_collection_info().await.unwrap().is_none());
        assert!(backend.search(&[1.0], 3).await.unwrap().is_empty());
        assert!(backend.delete_collection().await.is_err());
        assert!(backend.upsert_records(vec![record(0, vec![1.0])]).await.is_err());
    }
}
