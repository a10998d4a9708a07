//! Database context for managing connections and repository access.
//!
//! The DbContext is the primary entry point for all database operations.
//! It holds the connection factory and hands out repositories; nothing in the
//! crate keeps a process-wide database handle.

use std::path::Path;

use diesel_async::SimpleAsyncConnection;

use super::annotation::AnnotationRepository;
use super::document::DocumentRepository;
use super::pool::{DbError, DbPool};

/// Database context that manages the connection pool and provides repository access.
///
/// # Example
/// ```ignore
/// let ctx = DbContext::new(&db_path);
/// ctx.init_schema().await?;
/// let docs = ctx.documents().list().await?;
/// ```
#[derive(Clone, Debug)]
pub struct DbContext {
    pool: DbPool,
}

impl DbContext {
    /// Create a context from a database file path.
    pub fn new(db_path: &Path) -> Self {
        Self {
            pool: DbPool::from_path(db_path),
        }
    }

    /// Create a context from a database URL (`sqlite:` prefix optional).
    pub fn from_url(url: &str) -> Self {
        Self {
            pool: DbPool::new(url),
        }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Get a document repository.
    pub fn documents(&self) -> DocumentRepository {
        DocumentRepository::new(self.pool.clone())
    }

    /// Get an annotation and topic repository.
    pub fn annotations(&self) -> AnnotationRepository {
        AnnotationRepository::new(self.pool.clone())
    }

    /// Initialize database schema.
    ///
    /// WAL lets listing requests read while an ingestion transaction is open.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;
        conn.batch_execute("PRAGMA journal_mode = WAL;").await?;
        conn.batch_execute(include_str!("schema_sqlite.sql")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        ctx.init_schema().await.unwrap();

        assert!(ctx.documents().list().await.unwrap().is_empty());
        assert!(ctx.annotations().list_topics().await.unwrap().is_empty());
    }
}
