use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write as _;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::database::{SqliteVectorStore, VectorRecord, VectorStore};
use crate::ollama::{ModelInfo, OllamaClient};
use crate::retrieval::RetrievalOrchestrator;
use crate::retrieval::context::truncate_chars;

/// Width of the text column in `list` output
pub const LIST_TEXT_WIDTH: usize = 40;

pub type OllamaOrchestrator = RetrievalOrchestrator<OllamaClient, OllamaClient>;

/// Open the vector database in the config directory and create its schema if missing
#[inline]
pub async fn open_store(config: &Config) -> Result<Arc<SqliteVectorStore>> {
    let store = SqliteVectorStore::open_in_dir(
        config.get_base_dir(),
        config.ollama.embedding_dimension as usize,
        config.retrieval.metric,
    )
    .await
    .context("Failed to open vector database")?;

    store
        .initialize(false)
        .await
        .context("Failed to initialize vector database")?;

    Ok(Arc::new(store))
}

/// Build the retrieval pipeline against the configured Ollama server
#[inline]
pub async fn build_orchestrator(config: &Config) -> Result<OllamaOrchestrator> {
    let client = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    let store = open_store(config).await?;

    Ok(
        RetrievalOrchestrator::new(client.clone(), client, store, config.retrieval)
            .with_prefixes(
                config.ollama.document_prefix.clone(),
                config.ollama.query_prefix.clone(),
            ),
    )
}

/// Text to ingest: the given file, the inline text, or stdin when neither is set
#[inline]
pub fn read_input(file: Option<&Path>, text: Option<String>) -> Result<String> {
    match (file, text) {
        (Some(_), Some(_)) => bail!("Pass either a file or --text, not both"),
        (Some(path), None) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        (None, Some(text)) => Ok(text),
        (None, None) => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read text from stdin")?;
            Ok(buffer)
        }
    }
}

/// Segment, embed and store `text`
#[inline]
pub async fn ingest_text(
    config: &Config,
    text: &str,
    chunk_size: Option<usize>,
    overlap: Option<usize>,
) -> Result<usize> {
    let chunk_size = chunk_size.unwrap_or(config.chunking.chunk_size);
    let overlap = overlap.unwrap_or(config.chunking.overlap);
    let orchestrator = build_orchestrator(config).await?;

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(0).with_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} chunks {msg}")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };

    let result = orchestrator
        .ingest_with_progress(text, chunk_size, overlap, |done, total| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
        })
        .await;
    bar.finish_and_clear();

    let stored = result.context("Ingest failed")?;
    info!("Ingested {} chunks", stored);
    println!("Stored {} chunks", stored);
    Ok(stored)
}

/// Answer a question and print the result
#[inline]
pub async fn ask(
    config: &Config,
    question: &str,
    use_retrieval: bool,
    top_k: Option<usize>,
) -> Result<()> {
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let orchestrator = build_orchestrator(config).await?;

    let answer = orchestrator
        .answer(question, use_retrieval, top_k)
        .await
        .context("Failed to answer question")?;

    println!("{}", answer);
    Ok(())
}

/// Print the stored chunks closest to `question`
#[inline]
pub async fn search(config: &Config, question: &str, top_k: Option<usize>) -> Result<()> {
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let orchestrator = build_orchestrator(config).await?;

    let results = orchestrator
        .retrieve(question, top_k)
        .await
        .context("Search failed")?;

    if results.is_empty() {
        println!("{}", crate::retrieval::NO_CONTEXT_PLACEHOLDER);
        return Ok(());
    }

    for (rank, result) in results.iter().enumerate() {
        println!(
            "{}. {} {}",
            rank + 1,
            style(format!("[{}] ({:.4})", result.id, result.distance)).dim(),
            result.text
        );
    }

    Ok(())
}

/// One `list` line: padded id, then the text cut to [`LIST_TEXT_WIDTH`] characters
#[inline]
pub fn format_record_line(record: &VectorRecord) -> String {
    let flat = record.text.replace(['\n', '\r'], " ");
    let text = if flat.chars().count() > LIST_TEXT_WIDTH {
        truncate_chars(&flat, LIST_TEXT_WIDTH - 3)
    } else {
        flat
    };

    format!("{:<4} - {}", record.id, text)
}

/// Print every stored record in id order
#[inline]
pub async fn list_records(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let records = store.list_all().await.context("Failed to list records")?;

    if records.is_empty() {
        println!("The vector store is empty.");
        println!("Use 'chat-rag ingest <file>' to add text.");
        return Ok(());
    }

    for record in &records {
        println!("{}", format_record_line(record));
    }
    println!();
    println!(
        "{} records (dimension {}, metric {})",
        records.len(),
        store.dimension(),
        store.metric()
    );

    Ok(())
}

/// Destroy all stored records and recreate the schema
#[inline]
pub async fn reset_store(config: &Config, skip_confirmation: bool) -> Result<()> {
    if !skip_confirmation
        && !Confirm::new()
            .with_prompt("Delete all stored chunks?")
            .default(false)
            .interact()?
    {
        println!("Reset cancelled.");
        return Ok(());
    }

    // Opened without initializing so a dimension or metric change can be reset
    let store = SqliteVectorStore::open_in_dir(
        config.get_base_dir(),
        config.ollama.embedding_dimension as usize,
        config.retrieval.metric,
    )
    .await
    .context("Failed to open vector database")?;

    store.reset().await.context("Failed to reset vector store")?;
    warn!("Vector store reset");
    println!("Vector store reset.");
    Ok(())
}

/// One `doctor` line per pulled model, with whatever details the server reports
#[inline]
pub fn format_model_line(model: &ModelInfo) -> String {
    let mut line = model.name.clone();

    if let Some(details) = &model.details {
        let facts: Vec<&str> = [
            details.family.as_deref(),
            details.parameter_size.as_deref(),
            details.quantization_level.as_deref(),
            details.format.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !facts.is_empty() {
            let _ = write!(line, " ({})", facts.join(", "));
        }
    }
    if let Some(size) = model.size {
        let _ = write!(line, " {:.1} MB", size as f64 / 1_000_000.0);
    }
    if let Some(digest) = &model.digest {
        let _ = write!(line, " [{}]", digest.get(..12).unwrap_or(digest));
    }

    line
}

/// Check that Ollama is reachable and both configured models are pulled
#[inline]
pub async fn doctor(config: &Config) -> Result<()> {
    let client = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    let url = client.base_url().clone();

    let check = tokio::task::spawn_blocking(move || {
        client.health_check()?;
        client.list_models()
    })
    .await
    .context("Health check task failed")?;

    match check {
        Ok(models) => {
            println!("{} Ollama at {} is ready", style("✓").green(), url);
            for model in &models {
                println!("  {}", format_model_line(model));
            }
            Ok(())
        }
        Err(e) => {
            println!("{} {}", style("✗").red(), e);
            bail!("Ollama at {} is not ready", url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ollama::ModelDetails;
    use chrono::Utc;

    fn record(id: i64, text: &str) -> VectorRecord {
        VectorRecord {
            id,
            title: crate::database::derive_title(text),
            text: text.to_string(),
            embedding: vec![0.0],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn short_record_line() {
        assert_eq!(format_record_line(&record(7, "The cat sat.")), "7    - The cat sat.");
    }

    #[test]
    fn long_record_line_is_truncated() {
        let text = "a".repeat(60);
        let line = format_record_line(&record(12, &text));

        assert_eq!(line, format!("12   - {}...", "a".repeat(37)));
    }

    #[test]
    fn record_line_is_single_line() {
        let line = format_record_line(&record(1, "first\nsecond"));
        assert_eq!(line, "1    - first second");
    }

    #[test]
    fn input_sources_are_exclusive() -> Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let path = temp_dir.path().join("input.txt");
        std::fs::write(&path, "From a file.")?;

        assert_eq!(read_input(Some(&path), None)?, "From a file.");
        assert_eq!(read_input(None, Some("Inline.".to_string()))?, "Inline.");
        assert!(read_input(Some(&path), Some("Both.".to_string())).is_err());
        assert!(read_input(Some(&temp_dir.path().join("missing.txt")), None).is_err());

        Ok(())
    }

    #[tokio::test]
    async fn open_store_creates_database_in_config_dir() -> Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let config = Config {
            base_dir: temp_dir.path().join("nested"),
            ..Config::default()
        };

        let store = open_store(&config).await?;
        assert_eq!(store.count().await?, 0);
        assert!(config.database_path().exists());

        Ok(())
    }

    #[test]
    fn model_line_includes_reported_details() {
        let model = ModelInfo {
            name: "nomic-embed-text:latest".to_string(),
            size: Some(274_302_450),
            digest: Some("0a109f422b47e3a30ba2b10eca18548e944e8a23073ee3f3e947efcf3c45e59f".to_string()),
            details: Some(ModelDetails {
                format: Some("gguf".to_string()),
                family: Some("nomic-bert".to_string()),
                parameter_size: Some("137M".to_string()),
                quantization_level: Some("F16".to_string()),
            }),
        };

        assert_eq!(
            format_model_line(&model),
            "nomic-embed-text:latest (nomic-bert, 137M, F16, gguf) 274.3 MB [0a109f422b47]"
        );
    }

    #[test]
    fn model_line_with_name_only() {
        let model = ModelInfo {
            name: "llama3.2".to_string(),
            size: None,
            digest: None,
            details: None,
        };

        assert_eq!(format_model_line(&model), "llama3.2");
    }

    #[tokio::test]
    async fn reset_without_prompt_clears_records() -> Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let config = Config {
            base_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };

        {
            let store = open_store(&config).await?;
            let dimension = store.dimension();
            store.put("to be removed", &vec![0.1; dimension]).await?;
            store.pool().close().await;
        }

        reset_store(&config, true).await?;

        let store = open_store(&config).await?;
        assert_eq!(store.count().await?, 0);
        Ok(())
    }
}
