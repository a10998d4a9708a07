//! HTTP API and live-update socket.
//!
//! Provides:
//! - JSON endpoints for documents, pages, annotations and topics
//! - Raw uploads that feed the ingestion worker
//! - A WebSocket that relays state-change notifications

mod error;
mod handlers;
mod routes;

pub use error::ApiError;
pub use routes::create_router;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::hub::BroadcastHub;
use crate::ingest::{CommandRasterizer, IngestQueue, IngestWorker};
use crate::repository::{AnnotationRepository, DbContext, DocumentRepository};

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub documents: Arc<DocumentRepository>,
    pub annotations: Arc<AnnotationRepository>,
    pub hub: BroadcastHub,
    pub uploads: IngestQueue,
    pub upload_dir: PathBuf,
    pub web_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(ctx: &DbContext, hub: BroadcastHub, uploads: IngestQueue, settings: &Settings) -> Self {
        Self {
            documents: Arc::new(ctx.documents()),
            annotations: Arc::new(ctx.annotations()),
            hub,
            uploads,
            upload_dir: settings.upload_dir(),
            web_dir: settings.web_dir.clone(),
            max_upload_bytes: settings.max_upload_bytes,
        }
    }
}

/// Start the web server and the ingestion worker.
pub async fn serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;

    let hub = BroadcastHub::new(settings.subscriber_buffer);
    let rasterizer = CommandRasterizer::new(settings.rasterize.clone());
    if !rasterizer.is_available() {
        tracing::warn!(
            "{} or {} not found; uploads will fail to ingest",
            settings.rasterize.magick_binary,
            settings.rasterize.tesseract_binary
        );
    }
    let (uploads, _worker) = IngestWorker::new(&ctx, Arc::new(rasterizer), hub.clone()).spawn();

    let state = AppState::new(&ctx, hub, uploads, settings);
    let app = create_router(state);

    let addr: SocketAddr = bind.parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
