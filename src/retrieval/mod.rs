// Retrieval module
// Ingest (segment, embed, store) and answer (embed, search, assemble, chat) pipelines

pub mod context;


use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chat::{ChatProvider, ChatRequest};
use crate::config::RetrievalConfig;
use crate::database::{RetrievalResult, VectorStore};
use crate::embeddings::{EmbeddingProvider, segment};
use crate::{RagError, Result};

pub use context::{NO_CONTEXT_PLACEHOLDER, assemble};

/// Ties the segmenter, embedding provider, vector store and chat provider
/// together. The store is owned by the caller and shared through an `Arc`.
pub struct RetrievalOrchestrator<E, C> {
    embedder: E,
    chat: C,
    store: Arc<dyn VectorStore>,
    settings: RetrievalConfig,
    document_prefix: String,
    query_prefix: String,
}

fn with_prefix<'a>(prefix: &str, text: &'a str) -> Cow<'a, str> {
    if prefix.is_empty() {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("{}{}", prefix, text))
    }
}

impl<E: EmbeddingProvider, C: ChatProvider> RetrievalOrchestrator<E, C> {
    #[inline]
    pub fn new(
        embedder: E,
        chat: C,
        store: Arc<dyn VectorStore>,
        settings: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            chat,
            store,
            settings,
            document_prefix: String::new(),
            query_prefix: String::new(),
        }
    }

    /// Prefixes prepended to documents and questions before embedding only;
    /// stored text is never prefixed
    #[inline]
    pub fn with_prefixes(
        mut self,
        document_prefix: impl Into<String>,
        query_prefix: impl Into<String>,
    ) -> Self {
        self.document_prefix = document_prefix.into();
        self.query_prefix = query_prefix.into();
        self
    }

    #[inline]
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    #[inline]
    pub fn settings(&self) -> &RetrievalConfig {
        &self.settings
    }

    /// Segment `raw_text` and store every chunk, returning the number stored
    #[inline]
    pub async fn ingest(
        &self,
        raw_text: &str,
        chunk_size: usize,
        overlap: usize,
    ) -> Result<usize> {
        self.ingest_with_progress(raw_text, chunk_size, overlap, |_, _| {})
            .await
    }

    /// Like [`Self::ingest`], calling `on_progress(done, total)` after each stored chunk.
    ///
    /// Blank chunks are skipped. The rest are processed in order and the first
    /// failure stops ingestion with [`RagError::Ingest`]. Chunks stored before
    /// it are kept.
    #[inline]
    pub async fn ingest_with_progress<F>(
        &self,
        raw_text: &str,
        chunk_size: usize,
        overlap: usize,
        mut on_progress: F,
    ) -> Result<usize>
    where
        F: FnMut(usize, usize) + Send,
    {
        let mut chunks = segment(raw_text, chunk_size, overlap)?;
        let segmented = chunks.len();
        chunks.retain(|chunk| !chunk.text.trim().is_empty());
        if chunks.len() < segmented {
            debug!("Skipping {} blank chunks", segmented - chunks.len());
        }

        let total = chunks.len();
        info!("Ingesting {} chunks", total);

        for (index, chunk) in chunks.iter().enumerate() {
            let number = index + 1;
            debug!("Embedding chunk {}/{}", number, total);

            let stored = async {
                let embedding = self
                    .embedder
                    .embed(&with_prefix(&self.document_prefix, &chunk.text))
                    .await?;
                self.store.put(&chunk.text, &embedding).await
            }
            .await;

            if let Err(source) = stored {
                warn!("Ingest stopped at chunk {}/{}: {}", number, total, source);
                return Err(RagError::Ingest {
                    chunk: number,
                    total,
                    source: Box::new(source),
                });
            }

            on_progress(number, total);
        }

        info!("Stored {} chunks", total);
        Ok(total)
    }

    /// Embed `question` and return the `top_k` closest stored chunks
    #[inline]
    pub async fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<RetrievalResult>> {
        let embedding = self
            .embedder
            .embed(&with_prefix(&self.query_prefix, question))
            .await?;
        let results = self.store.query(&embedding, top_k).await?;

        debug!("Retrieved {} results for question", results.len());
        Ok(results)
    }

    /// Answer `question`, optionally grounding the chat call in retrieved context
    #[inline]
    pub async fn answer(
        &self,
        question: &str,
        use_retrieval: bool,
        top_k: usize,
    ) -> Result<String> {
        if !use_retrieval {
            debug!("Answering without retrieval");
            return self.chat.chat(ChatRequest::question_only(question)).await;
        }

        let results = self.retrieve(question, top_k).await?;
        let context = assemble(
            &results,
            self.settings.max_items,
            self.settings.max_chars_per_item,
        );

        self.chat
            .chat(ChatRequest::with_context(question, context))
            .await
    }
}
