
use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

use crate::{RagError, Result};

static SENTENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^.!?]+[.!?])\s+").expect("sentence regex is valid"));

/// A run of consecutive sentences ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The joined sentence text
    pub text: String,
    /// Position of this chunk in the segmented sequence, starting at 0
    pub source_offset: usize,
}

/// Sentence window configuration for chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Number of sentences per chunk
    pub chunk_size: usize,
    /// Number of sentences shared by consecutive chunks
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 16,
            overlap: 4,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn validate(&self) -> Result<()> {
        validate_window(self.chunk_size, self.overlap)
    }
}

/// Sentence splitting strategies, tried in [`SplitStrategy::ORDER`].
///
/// The order is part of the chunking contract: chunk counts for text without
/// sentence punctuation depend on which fallback wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Terminal `.`, `!` or `?` followed by whitespace
    Punctuation,
    /// Literal `". "` separator
    PeriodSpace,
    /// Line breaks
    Newline,
    /// The whole text as one sentence
    Whole,
}

impl SplitStrategy {
    pub const ORDER: [Self; 4] = [
        Self::Punctuation,
        Self::PeriodSpace,
        Self::Newline,
        Self::Whole,
    ];

    /// Returns `None` when this strategy finds no split in `text`
    #[inline]
    pub fn split(self, text: &str) -> Option<Vec<String>> {
        match self {
            Self::Punctuation => split_on_punctuation(text),
            Self::PeriodSpace => split_on_separator(text, ". "),
            Self::Newline => split_on_separator(text, "\n"),
            Self::Whole => Some(vec![text.to_string()]),
        }
    }
}

fn split_on_punctuation(text: &str) -> Option<Vec<String>> {
    let mut sentences = Vec::new();
    let mut remainder = String::new();
    let mut last_end = 0;

    for captures in SENTENCE_REGEX.captures_iter(text) {
        // The pattern has no lookaround, so matching cannot fail at runtime
        let Ok(captures) = captures else { break };
        let (Some(whole), Some(sentence)) = (captures.get(0), captures.get(1)) else {
            continue;
        };

        remainder.push_str(text.get(last_end..whole.start()).unwrap_or_default());
        sentences.push(sentence.as_str().trim().to_string());
        last_end = whole.end();
    }

    if sentences.is_empty() {
        return None;
    }

    // Whatever the matches left behind becomes the final sentence
    remainder.push_str(text.get(last_end..).unwrap_or_default());
    let remainder = remainder.trim();
    if !remainder.is_empty() {
        sentences.push(remainder.to_string());
    }

    Some(sentences)
}

fn split_on_separator(text: &str, separator: &str) -> Option<Vec<String>> {
    let pieces: Vec<String> = text.split(separator).map(str::to_string).collect();
    (pieces.len() > 1).then_some(pieces)
}

/// Split text into sentences using the first strategy that finds a split
#[inline]
pub fn split_into_sentences(text: &str) -> Vec<String> {
    SplitStrategy::ORDER
        .iter()
        .find_map(|strategy| {
            strategy.split(text).inspect(|sentences| {
                debug!(
                    "Split text into {} sentences using {:?}",
                    sentences.len(),
                    strategy
                );
            })
        })
        .unwrap_or_default()
}

fn validate_window(chunk_size: usize, overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::Configuration(
            "chunk size must be greater than 0".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(RagError::Configuration(format!(
            "overlap ({}) must be less than chunk size ({})",
            overlap, chunk_size
        )));
    }
    Ok(())
}

/// Segment text into overlapping windows of `chunk_size` sentences.
///
/// Consecutive windows start `chunk_size - overlap` sentences apart and the
/// last window may be shorter. Empty or whitespace-only text yields no chunks.
#[inline]
pub fn segment(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    validate_window(chunk_size, overlap)?;

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let sentences = split_into_sentences(text);
    let step = chunk_size - overlap;

    let chunks: Vec<Chunk> = (0..sentences.len())
        .step_by(step)
        .enumerate()
        .map(|(source_offset, start)| {
            let end = start.saturating_add(chunk_size).min(sentences.len());
            Chunk {
                text: sentences[start..end].join(" "),
                source_offset,
            }
        })
        .collect();

    debug!(
        "Segmented {} sentences into {} chunks (size {}, overlap {})",
        sentences.len(),
        chunks.len(),
        chunk_size,
        overlap
    );

    Ok(chunks)
}
