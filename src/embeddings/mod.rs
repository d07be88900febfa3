// Embeddings module
// Sentence chunking and the embedding provider boundary

use async_trait::async_trait;

pub mod chunking;

pub use chunking::{Chunk, ChunkingConfig, SplitStrategy, segment, split_into_sentences};

/// A fixed-length embedding vector as returned by the provider
pub type Embedding = Vec<f32>;

/// Converts text into an embedding vector.
///
/// Implementations must surface every failure as [`crate::RagError::Provider`]
/// and must never return an empty vector. Retrying is left to the caller.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> crate::Result<Embedding>;
}
