//! Document ingestion: recognition records and page images in, committed
//! documents out.

pub mod coordinator;
pub mod error;
pub mod page;
pub mod rasterize;
pub mod tokens;
pub mod worker;

pub use coordinator::{DocumentIngestionCoordinator, IngestSummary};
pub use error::{ExtractError, IngestError, ProcessError, QueueClosed, RasterizeError};
pub use page::{ingest_page, PageAssets, PageSource};
pub use rasterize::{collect_rendered_pages, CommandRasterizer, RasterizeConfig, Rasterizer};
pub use tokens::{extract_tokens, RunningText};
pub use worker::{IngestQueue, IngestWorker, UploadCompleted};
