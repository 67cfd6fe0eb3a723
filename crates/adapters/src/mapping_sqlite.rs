//! SQLite mapping store implementation

use async_trait::async_trait;
use blog_bridge_domain::{MappingError, MappingStore, PostMeta};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use time::OffsetDateTime;

/// SQLite-backed mapping store
///
/// One row per `(document_id, meta_key)`, so concurrent publishes of the same
/// document to different platforms only ever touch their own rows.
pub struct SqliteMappingStore {
    pool: SqlitePool,
}

impl SqliteMappingStore {
    /// Create a new SQLite mapping store, initializing the database if needed
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, MappingError> {
        let db_path = db_path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MappingError::Database(format!("Failed to create directory: {}", e))
            })?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(db_error)?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, MappingError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(db_error)?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), MappingError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS post_meta (
                document_id TEXT NOT NULL,
                meta_key TEXT NOT NULL,
                meta_value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (document_id, meta_key)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    /// Last time any key of the document changed
    pub async fn last_updated(
        &self,
        document_id: &str,
    ) -> Result<Option<OffsetDateTime>, MappingError> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT MAX(updated_at) FROM post_meta WHERE document_id = ?")
                .bind(document_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        match row.and_then(|(updated_at,)| updated_at) {
            Some(updated_at) => {
                let parsed = OffsetDateTime::parse(
                    &updated_at,
                    &time::format_description::well_known::Rfc3339,
                )
                .map_err(|e| MappingError::Serialization(e.to_string()))?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }
}

fn db_error(e: sqlx::Error) -> MappingError {
    MappingError::Database(e.to_string())
}

#[async_trait]
impl MappingStore for SqliteMappingStore {
    async fn get_meta(&self, document_id: &str) -> Result<PostMeta, MappingError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT meta_key, meta_value FROM post_meta WHERE document_id = ? ORDER BY meta_key",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().collect())
    }

    async fn merge_meta(&self, document_id: &str, updates: &PostMeta) -> Result<(), MappingError> {
        if updates.is_empty() {
            return Ok(());
        }

        let updated_at = OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .map_err(|e| MappingError::Serialization(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(db_error)?;
        for (key, value) in updates {
            sqlx::query(
                r#"
                INSERT INTO post_meta (document_id, meta_key, meta_value, updated_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(document_id, meta_key) DO UPDATE SET
                    meta_value = excluded.meta_value,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(document_id)
            .bind(key)
            .bind(value)
            .bind(&updated_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }
        tx.commit().await.map_err(db_error)?;

        Ok(())
    }

    async fn remove_keys(&self, document_id: &str, keys: &[&str]) -> Result<(), MappingError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        for key in keys {
            sqlx::query("DELETE FROM post_meta WHERE document_id = ? AND meta_key = ?")
                .bind(document_id)
                .bind(*key)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }
        tx.commit().await.map_err(db_error)?;

        Ok(())
    }
}
