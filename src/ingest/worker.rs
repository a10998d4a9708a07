//! Sequential ingestion of completed uploads.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::coordinator::{DocumentIngestionCoordinator, IngestSummary};
use super::error::{ProcessError, QueueClosed};
use super::page::PageSource;
use super::rasterize::Rasterizer;
use crate::hub::{BroadcastHub, Notification};
use crate::repository::{DbContext, DocumentRepository};

/// Uploads that may wait for the worker before senders have to wait too.
const QUEUE_DEPTH: usize = 64;

/// A finished upload ready for ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCompleted {
    pub path: PathBuf,
    pub display_name: String,
}

/// Sending side of the ingestion queue.
#[derive(Debug, Clone)]
pub struct IngestQueue {
    tx: mpsc::Sender<UploadCompleted>,
}

impl IngestQueue {
    /// Enqueue an upload. Waits if the queue is full.
    pub async fn submit(&self, upload: UploadCompleted) -> Result<(), QueueClosed> {
        self.tx.send(upload).await.map_err(|_| QueueClosed)
    }

    /// A queue whose receiving end is handed back to the caller.
    pub fn channel() -> (Self, mpsc::Receiver<UploadCompleted>) {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        (Self { tx }, rx)
    }
}

/// Consumes uploads one at a time, so at most one ingestion runs per process.
pub struct IngestWorker {
    documents: DocumentRepository,
    coordinator: DocumentIngestionCoordinator,
    rasterizer: Arc<dyn Rasterizer>,
    hub: BroadcastHub,
}

impl IngestWorker {
    pub fn new(ctx: &DbContext, rasterizer: Arc<dyn Rasterizer>, hub: BroadcastHub) -> Self {
        Self {
            documents: ctx.documents(),
            coordinator: DocumentIngestionCoordinator::new(ctx.pool().clone()),
            rasterizer,
            hub,
        }
    }

    /// Start the worker on its own task.
    ///
    /// The worker stops once every [`IngestQueue`] clone is dropped.
    pub fn spawn(self) -> (IngestQueue, JoinHandle<()>) {
        let (queue, rx) = IngestQueue::channel();
        let handle = tokio::spawn(self.run(rx));
        (queue, handle)
    }

    /// Process uploads in arrival order until the queue closes.
    ///
    /// A failed upload is logged and its file kept for inspection; the worker
    /// moves on to the next one.
    pub async fn run(self, mut rx: mpsc::Receiver<UploadCompleted>) {
        while let Some(upload) = rx.recv().await {
            match self.process_upload(&upload).await {
                Ok(_) => {
                    if let Err(e) = tokio::fs::remove_file(&upload.path).await {
                        warn!(path = %upload.path.display(), error = %e, "Failed to remove upload");
                    }
                }
                Err(e) => {
                    error!(
                        name = %upload.display_name,
                        path = %upload.path.display(),
                        error = %e,
                        "Ingestion failed"
                    );
                }
            }
        }
        info!("Ingestion queue closed");
    }

    /// Create the document, render the upload and ingest its pages.
    pub async fn process_upload(
        &self,
        upload: &UploadCompleted,
    ) -> Result<IngestSummary, ProcessError> {
        let document_id = self.announce(&upload.display_name).await?;

        let workdir = tempfile::tempdir()?;
        let pages = self.rasterizer.rasterize(&upload.path, workdir.path()).await?;

        self.complete(document_id, &pages).await
    }

    /// Ingest pages that were rendered elsewhere.
    pub async fn ingest_rendered(
        &self,
        display_name: &str,
        pages: &[PageSource],
    ) -> Result<IngestSummary, ProcessError> {
        let document_id = self.announce(display_name).await?;
        self.complete(document_id, pages).await
    }

    async fn announce(&self, display_name: &str) -> Result<i32, ProcessError> {
        let document_id = self.documents.create(display_name).await?;
        info!(document_id, name = %display_name, "Created document");
        self.hub.notify(&Notification::DocumentsChanged);
        Ok(document_id)
    }

    async fn complete(
        &self,
        document_id: i32,
        pages: &[PageSource],
    ) -> Result<IngestSummary, ProcessError> {
        let summary = self.coordinator.ingest(document_id, pages).await?;
        self.hub.notify(&Notification::DocumentsChanged);
        Ok(summary)
    }
}
