// In-memory vector store
// Same contract as the SQLite backend, without persistence; used by tests and
// throwaway sessions

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    DistanceMetric, RetrievalResult, VectorRecord, VectorStore, check_dimension, check_k,
    derive_title, rank,
};
use crate::{RagError, Result};

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<VectorRecord>,
    next_id: i64,
}

/// Vector store holding every record in process memory
#[derive(Debug)]
pub struct MemoryVectorStore {
    dimension: usize,
    metric: DistanceMetric,
    /// `None` until initialized
    state: RwLock<Option<MemoryState>>,
}

fn not_initialized() -> RagError {
    RagError::Storage("vector store is not initialized".to_string())
}

impl MemoryVectorStore {
    #[inline]
    pub fn new(dimension: usize, metric: DistanceMetric) -> Self {
        Self {
            dimension,
            metric,
            state: RwLock::new(None),
        }
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    async fn initialize(&self, overwrite: bool) -> Result<()> {
        let mut state = self.state.write().await;
        if overwrite || state.is_none() {
            *state = Some(MemoryState {
                records: Vec::new(),
                next_id: 1,
            });
        }
        Ok(())
    }

    async fn put(&self, text: &str, embedding: &[f32]) -> Result<i64> {
        check_dimension(self.dimension, embedding)?;

        let mut guard = self.state.write().await;
        let state = guard.as_mut().ok_or_else(not_initialized)?;

        let id = state.next_id;
        state.next_id += 1;
        state.records.push(VectorRecord {
            id,
            title: derive_title(text),
            text: text.to_string(),
            embedding: embedding.to_vec(),
            created_at: Utc::now(),
        });

        debug!("Stored vector {} in memory", id);
        Ok(id)
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
        check_k(k)?;
        check_dimension(self.dimension, embedding)?;

        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or_else(not_initialized)?;

        let results = state
            .records
            .iter()
            .map(|record| RetrievalResult {
                id: record.id,
                text: record.text.clone(),
                embedding: record.embedding.clone(),
                distance: self.metric.distance(embedding, &record.embedding),
            })
            .collect();

        Ok(rank(results, k))
    }

    async fn list_all(&self) -> Result<Vec<VectorRecord>> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or_else(not_initialized)?;
        Ok(state.records.clone())
    }

    async fn count(&self) -> Result<usize> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or_else(not_initialized)?;
        Ok(state.records.len())
    }
}
