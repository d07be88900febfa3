use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    DistanceMetric, RetrievalResult, VectorRecord, VectorStore, check_dimension, check_k,
    derive_title, rank,
};
use crate::{RagError, Result};


pub const DATABASE_FILE_NAME: &str = "vectors.db";

const META_DIMENSION: &str = "dimension";
const META_METRIC: &str = "metric";

/// Vector store persisted to a single SQLite file.
///
/// Embeddings are stored as little-endian `f32` blobs and ranked in process.
/// Writes are serialized through a lock; reads share the connection pool.
#[derive(Debug)]
pub struct SqliteVectorStore {
    pool: SqlitePool,
    dimension: usize,
    metric: DistanceMetric,
    write_lock: Mutex<()>,
}

fn storage_error(context: &str, err: sqlx::Error) -> RagError {
    RagError::Storage(format!("{}: {}", context, err))
}

impl SqliteVectorStore {
    /// Open (or create) the database file. The schema is not created until
    /// [`VectorStore::initialize`] is called.
    #[inline]
    pub async fn open<P: AsRef<Path>>(
        path: P,
        dimension: usize,
        metric: DistanceMetric,
    ) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::Configuration(
                "embedding dimension must be greater than 0".to_string(),
            ));
        }

        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| storage_error("Failed to open vector database", e))?;

        debug!(
            "Opened vector database at {} (dimension {}, metric {})",
            path.as_ref().display(),
            dimension,
            metric
        );

        Ok(Self {
            pool,
            dimension,
            metric,
            write_lock: Mutex::new(()),
        })
    }

    /// Open `vectors.db` inside `config_dir`, creating the directory if needed
    #[inline]
    pub async fn open_in_dir(
        config_dir: &Path,
        dimension: usize,
        metric: DistanceMetric,
    ) -> Result<Self> {
        std::fs::create_dir_all(config_dir)?;
        Self::open(config_dir.join(DATABASE_FILE_NAME), dimension, metric).await
    }

    #[inline]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn is_initialized(&self) -> Result<bool> {
        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('vectors', 'store_meta')",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to inspect schema", e))?;

        Ok(tables == 2)
    }

    async fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized().await? {
            Ok(())
        } else {
            Err(RagError::Storage(
                "vector store is not initialized".to_string(),
            ))
        }
    }

    async fn read_meta(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT value FROM store_meta WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to read store metadata", e))
    }

    /// Reject a persisted store whose dimension or metric disagrees with ours
    async fn check_persisted_meta(&self) -> Result<()> {
        if let Some(stored) = self.read_meta(META_DIMENSION).await? {
            let stored: usize = stored.parse().map_err(|_| {
                RagError::Storage(format!("corrupt stored dimension '{}'", stored))
            })?;
            if stored != self.dimension {
                return Err(RagError::DimensionMismatch {
                    expected: stored,
                    actual: self.dimension,
                });
            }
        }

        if let Some(stored) = self.read_meta(META_METRIC).await? {
            let stored: DistanceMetric = stored.parse()?;
            if stored != self.metric {
                return Err(RagError::Configuration(format!(
                    "store was created with the {} metric but {} is configured; reset the store to change it",
                    stored, self.metric
                )));
            }
        }

        Ok(())
    }

    async fn create_schema(&self) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error("Failed to begin transaction", e))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS vectors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| storage_error("Failed to create vectors table", e))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS store_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| storage_error("Failed to create store_meta table", e))?;

        for (key, value) in [
            (META_DIMENSION, self.dimension.to_string()),
            (META_METRIC, self.metric.to_string()),
        ] {
            sqlx::query("INSERT OR IGNORE INTO store_meta (key, value) VALUES (?1, ?2)")
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await
                .map_err(|e| storage_error("Failed to write store metadata", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| storage_error("Failed to commit schema", e))
    }

    async fn drop_schema(&self) -> Result<()> {
        sqlx::query("DROP TABLE IF EXISTS vectors")
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to drop vectors table", e))?;

        sqlx::query("DROP TABLE IF EXISTS store_meta")
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to drop store_meta table", e))?;

        Ok(())
    }

    fn checked_embedding(&self, id: i64, bytes: &[u8]) -> Result<Vec<f32>> {
        let embedding = decode_embedding(bytes);
        if bytes.len() % 4 != 0 || embedding.len() != self.dimension {
            return Err(RagError::Storage(format!(
                "record {} has a corrupt embedding ({} bytes)",
                id,
                bytes.len()
            )));
        }
        Ok(embedding)
    }

    fn row_to_record(&self, row: &SqliteRow) -> Result<VectorRecord> {
        let id: i64 = row.try_get("id").map_err(|e| storage_error("id", e))?;
        let blob: Vec<u8> = row
            .try_get("embedding")
            .map_err(|e| storage_error("embedding", e))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| storage_error("created_at", e))?;

        Ok(VectorRecord {
            id,
            title: row.try_get("title").map_err(|e| storage_error("title", e))?,
            text: row.try_get("text").map_err(|e| storage_error("text", e))?,
            embedding: self.checked_embedding(id, &blob)?,
            created_at,
        })
    }
}

pub(crate) fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub(crate) fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    async fn initialize(&self, overwrite: bool) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if overwrite {
            warn!("Dropping all stored vectors");
            self.drop_schema().await?;
        } else if self.is_initialized().await? {
            self.check_persisted_meta().await?;
            debug!("Vector store schema already present");
            return Ok(());
        }

        self.create_schema().await?;
        info!(
            "Initialized vector store (dimension {}, metric {})",
            self.dimension, self.metric
        );
        Ok(())
    }

    async fn put(&self, text: &str, embedding: &[f32]) -> Result<i64> {
        check_dimension(self.dimension, embedding)?;
        let _guard = self.write_lock.lock().await;
        self.ensure_initialized().await?;

        let id = sqlx::query(
            "INSERT INTO vectors (title, text, embedding, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(derive_title(text))
        .bind(text)
        .bind(encode_embedding(embedding))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to insert vector", e))?
        .last_insert_rowid();

        debug!("Stored vector {} ({} chars)", id, text.len());
        Ok(id)
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
        check_k(k)?;
        check_dimension(self.dimension, embedding)?;
        self.ensure_initialized().await?;

        let mut rows =
            sqlx::query("SELECT id, text, embedding FROM vectors ORDER BY id").fetch(&self.pool);
        let mut results = Vec::new();

        while let Some(row) = rows
            .try_next()
            .await
            .map_err(|e| storage_error("Failed to scan vectors", e))?
        {
            let id: i64 = row.try_get("id").map_err(|e| storage_error("id", e))?;
            let blob: Vec<u8> = row
                .try_get("embedding")
                .map_err(|e| storage_error("embedding", e))?;
            let stored = self.checked_embedding(id, &blob)?;

            results.push(RetrievalResult {
                id,
                text: row.try_get("text").map_err(|e| storage_error("text", e))?,
                distance: self.metric.distance(embedding, &stored),
                embedding: stored,
            });
        }

        debug!("Ranking {} stored vectors for top {}", results.len(), k);
        Ok(rank(results, k))
    }

    async fn list_all(&self) -> Result<Vec<VectorRecord>> {
        self.ensure_initialized().await?;

        let rows = sqlx::query(
            "SELECT id, title, text, embedding, created_at FROM vectors ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to list vectors", e))?;

        rows.iter().map(|row| self.row_to_record(row)).collect()
    }

    async fn count(&self) -> Result<usize> {
        self.ensure_initialized().await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vectors")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to count vectors", e))?;

        usize::try_from(count).map_err(|_| RagError::Storage(format!("invalid count {}", count)))
    }
}
