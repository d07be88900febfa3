// Database module
// Vector storage behind a single trait, with SQLite and in-memory backends

pub mod distance;
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{RagError, Result};

pub use distance::{DistanceMetric, rank};
pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

/// Number of characters of the chunk text kept as the record title
pub const TITLE_CHARS: usize = 8;

/// A persisted chunk and its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// One nearest-neighbour hit, ordered by ascending distance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub id: i64,
    pub text: String,
    pub embedding: Vec<f32>,
    pub distance: f64,
}

impl fmt::Display for RetrievalResult {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ({:.4}) {}", self.id, self.distance, self.text)
    }
}

/// Storage for `(text, embedding)` pairs with nearest-neighbour lookup.
///
/// Embedding dimension and distance metric are fixed for the lifetime of the
/// persisted state; changing either requires [`VectorStore::reset`].
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Dimension every stored and queried embedding must have
    fn dimension(&self) -> usize;

    fn metric(&self) -> DistanceMetric;

    /// Create the schema. With `overwrite`, existing records are destroyed first.
    ///
    /// Without `overwrite` this is idempotent and keeps existing data, but fails
    /// if the persisted dimension or metric differs from this store's.
    async fn initialize(&self, overwrite: bool) -> Result<()>;

    /// Destroy all records and recreate the schema
    async fn reset(&self) -> Result<()> {
        self.initialize(true).await
    }

    /// Store a chunk, returning its id
    async fn put(&self, text: &str, embedding: &[f32]) -> Result<i64>;

    /// Return at most `k` records nearest to `embedding`, closest first
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<RetrievalResult>>;

    /// All records in ascending id order
    async fn list_all(&self) -> Result<Vec<VectorRecord>>;

    async fn count(&self) -> Result<usize>;
}

/// Short label derived from the chunk text
#[inline]
pub fn derive_title(text: &str) -> String {
    text.chars().take(TITLE_CHARS).collect()
}

pub(crate) fn check_dimension(expected: usize, embedding: &[f32]) -> Result<()> {
    if embedding.len() == expected {
        Ok(())
    } else {
        Err(RagError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        })
    }
}

pub(crate) fn check_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(RagError::Configuration(
            "query k must be greater than 0".to_string(),
        ));
    }
    Ok(())
}
