use async_trait::async_trait;
use nr_core::{EmbeddingStore, Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::text_key;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS embeddings (
        key TEXT PRIMARY KEY,
        embedding TEXT NOT NULL,
        last_used INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS embeddings_last_used ON embeddings (last_used)",
];

/// Embedding store persisted across runs in a SQLite file.
///
/// Rows are keyed by the SHA-256 of the embedded text. `last_used` is a
/// logical clock kept in the table itself, so recency survives restarts.
pub struct SqliteStore {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
    max_items: usize,
}

impl SqliteStore {
    pub async fn new_with_path(db_path: &Path, max_items: usize) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| Error::Storage(format!("Failed to open embedding cache: {}", e)))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("Failed to run migration {}: {}", i, e)))?;
        }

        tracing::info!("💾 Embedding cache opened at {}", db_path.display());
        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
            max_items,
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }
}

#[async_trait]
impl EmbeddingStore for SqliteStore {
    async fn get(&self, text: &str) -> Result<Option<Vec<f32>>> {
        let key = text_key(text);
        let row = sqlx::query_scalar::<_, String>("SELECT embedding FROM embeddings WHERE key = ?")
            .bind(&key)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("Failed to read embedding: {}", e)))?;

        let Some(raw) = row else {
            return Ok(None);
        };

        sqlx::query(
            "UPDATE embeddings SET last_used = (SELECT MAX(last_used) + 1 FROM embeddings) \
             WHERE key = ?",
        )
        .bind(&key)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Storage(format!("Failed to touch embedding: {}", e)))?;

        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn put(&self, text: &str, embedding: &[f32]) -> Result<()> {
        let raw = serde_json::to_string(embedding)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO embeddings (key, embedding, last_used)
            VALUES (?, ?, (SELECT COALESCE(MAX(last_used), 0) + 1 FROM embeddings))
            "#,
        )
        .bind(text_key(text))
        .bind(raw)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Storage(format!("Failed to store embedding: {}", e)))?;

        let trimmed = sqlx::query(
            r#"
            DELETE FROM embeddings WHERE key NOT IN (
                SELECT key FROM embeddings ORDER BY last_used DESC LIMIT ?
            )
            "#,
        )
        .bind(self.max_items as i64)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Storage(format!("Failed to trim embedding cache: {}", e)))?
        .rows_affected();
        if trimmed > 0 {
            tracing::debug!(
                evicted = trimmed,
                max_items = self.max_items,
                "trimmed embedding cache"
            );
        }

        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM embeddings")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("Failed to count embeddings: {}", e)))?;
        Ok(count as usize)
    }
}
