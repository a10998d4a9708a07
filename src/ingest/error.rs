//! Ingestion error types.

use thiserror::Error;

use crate::repository::DbError;

/// A malformed word-recognition record.
///
/// `record` is the 1-based line number inside the page's record stream,
/// counting the header.
#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("record {record}: expected at least {expected} columns, found {found}")]
    MissingColumns {
        record: usize,
        expected: usize,
        found: usize,
    },

    #[error("record {record}: invalid {column} value {value:?}")]
    InvalidNumber {
        record: usize,
        column: &'static str,
        value: String,
    },

    #[error("record {record}: bounding box exceeds pixel range")]
    BoxOverflow { record: usize },

    #[error("record {record}: document text exceeds addressable length")]
    OffsetOverflow { record: usize },
}

/// Failure while ingesting a document. Page numbers are 1-based.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("page {page}: cannot read recognition output: {source}")]
    ReadRecognition {
        page: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("page {page}: {source}")]
    Extract {
        page: u32,
        #[source]
        source: ExtractError,
    },

    #[error("page {page}: cannot read image: {source}")]
    ReadImage {
        page: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("page {page}: cannot decode image: {source}")]
    DecodeImage {
        page: u32,
        #[source]
        source: image::ImageError,
    },

    #[error("page {page}: invalid image dimensions {width}x{height}")]
    InvalidDimensions { page: u32, width: u32, height: u32 },

    #[error("page {page}: cannot encode tokens: {source}")]
    EncodeTokens {
        page: u32,
        #[source]
        source: serde_json::Error,
    },

    #[error("page {page}: cannot store page: {source}")]
    InsertPage {
        page: u32,
        #[source]
        source: DbError,
    },

    #[error("document {0} has no pages")]
    NoPages(i32),

    #[error("document {0} not found")]
    DocumentNotFound(i32),

    #[error("document {0} is already processed")]
    AlreadyProcessed(i32),

    #[error("document {0} is already being ingested")]
    AlreadyIngesting(i32),

    #[error("storage error: {0}")]
    Storage(#[from] DbError),
}

impl IngestError {
    /// The page that caused the failure, if the failure is page-specific.
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::ReadRecognition { page, .. }
            | Self::Extract { page, .. }
            | Self::ReadImage { page, .. }
            | Self::DecodeImage { page, .. }
            | Self::InvalidDimensions { page, .. }
            | Self::EncodeTokens { page, .. }
            | Self::InsertPage { page, .. } => Some(*page),
            _ => None,
        }
    }
}

/// Failure of the external rasterization/recognition step.
#[derive(Debug, Error)]
pub enum RasterizeError {
    #[error("{0} not found (install ImageMagick and tesseract-ocr)")]
    BinaryNotFound(String),

    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("no pages rendered from {0}")]
    NoPages(String),

    #[error("page {0} has no recognition output")]
    MissingRecognition(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure handling a completed upload end to end.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Rasterize(#[from] RasterizeError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("storage error: {0}")]
    Storage(#[from] DbError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The ingestion worker has stopped and no longer accepts uploads.
#[derive(Debug, Error)]
#[error("ingestion queue is closed")]
pub struct QueueClosed;
