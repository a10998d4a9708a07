//! SQLite connection factory.
//!
//! Uses diesel-async's SyncConnectionWrapper to provide an async interface
//! for SQLite. Since SQLite connections are lightweight, we open a new
//! connection per operation rather than pooling.

use std::path::Path;

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, SimpleAsyncConnection};

use super::util::to_diesel_error;

/// Diesel error type alias.
pub type DbError = diesel::result::Error;

/// Async SQLite connection type.
pub type SqliteConn = SyncConnectionWrapper<SqliteConnection>;

/// Per-connection settings. Foreign keys are off by default in SQLite and
/// page/annotation cleanup relies on `ON DELETE CASCADE`.
const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;";

/// Handle used to open SQLite connections.
///
/// Constructed once at startup and passed to every repository and to the
/// ingestion coordinator.
#[derive(Clone, Debug)]
pub struct DbPool {
    database_url: String,
}

impl DbPool {
    /// Create a pool from a database URL or path.
    pub fn new(database_url: &str) -> Self {
        // Strip sqlite: prefix if present for diesel
        let url = database_url
            .strip_prefix("sqlite://")
            .or_else(|| database_url.strip_prefix("sqlite:"))
            .unwrap_or(database_url);
        Self {
            database_url: url.to_string(),
        }
    }

    /// Create pool from a file path.
    pub fn from_path(path: &Path) -> Self {
        Self::new(&path.display().to_string())
    }

    /// Open a connection with the per-connection pragmas applied.
    pub async fn get(&self) -> Result<SqliteConn, DbError> {
        let mut conn = SqliteConn::establish(&self.database_url)
            .await
            .map_err(to_diesel_error)?;
        conn.batch_execute(CONNECTION_PRAGMAS).await?;
        Ok(conn)
    }

    /// Get the database URL.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_sqlite_prefix() {
        assert_eq!(DbPool::new("sqlite:/tmp/a.db").database_url(), "/tmp/a.db");
        assert_eq!(DbPool::new("sqlite:///tmp/a.db").database_url(), "/tmp/a.db");
        assert_eq!(DbPool::new("/tmp/a.db").database_url(), "/tmp/a.db");
    }
}
