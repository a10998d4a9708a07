//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM with compile-time query checking
//! against SQLite.

pub mod annotation;
pub mod context;
pub mod document;
pub mod models;
pub mod pool;
pub mod util;

pub use annotation::AnnotationRepository;
pub use context::DbContext;
pub use document::DocumentRepository;
pub use pool::{DbError, DbPool, SqliteConn};
