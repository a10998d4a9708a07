//! spectator - scanned document ingestion, annotation and live updates.
//!
//! Rasterized pages and their word-recognition output are turned into one
//! character-addressable document text with a per-page token index, committed
//! atomically to SQLite and served over HTTP.

pub mod cli;
pub mod config;
pub mod hub;
pub mod ingest;
pub mod models;
pub mod repository;
pub mod schema;
pub mod server;
