//! Whole-document ingestion inside one transaction.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use diesel_async::SimpleAsyncConnection;
use tracing::{debug, info, warn};

use super::error::IngestError;
use super::page::{ingest_page, PageAssets, PageSource};
use super::tokens::{extract_tokens, RunningText};
use crate::repository::document::{finalize_in, find_in};
use crate::repository::{DbPool, SqliteConn};

/// Outcome of a committed ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub document_id: i32,
    pub page_count: u32,
    pub token_count: usize,
    /// Length of the committed text in characters.
    pub text_len: usize,
}

/// Runs the page loop for a document and commits it atomically.
///
/// Pages are handled strictly in the order given and numbered from 1. Any
/// failing page rolls back every page already written, leaving the document
/// unprocessed. There are no retries.
///
/// A document id can only be ingested by one call at a time; a concurrent
/// call for the same id fails with [`IngestError::AlreadyIngesting`].
#[derive(Clone, Debug)]
pub struct DocumentIngestionCoordinator {
    pool: DbPool,
    active: Arc<Mutex<HashSet<i32>>>,
}

/// Releases a document id when ingestion ends.
struct ActiveGuard {
    active: Arc<Mutex<HashSet<i32>>>,
    document_id: i32,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.document_id);
    }
}

impl DocumentIngestionCoordinator {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn claim(&self, document_id: i32) -> Result<ActiveGuard, IngestError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(document_id) {
            return Err(IngestError::AlreadyIngesting(document_id));
        }
        Ok(ActiveGuard {
            active: Arc::clone(&self.active),
            document_id,
        })
    }

    /// Ingest `pages` into an existing, unprocessed document.
    ///
    /// Page assets are read and decoded before the write transaction opens,
    /// so the database is only locked for the inserts and the finalize.
    pub async fn ingest(
        &self,
        document_id: i32,
        pages: &[PageSource],
    ) -> Result<IngestSummary, IngestError> {
        let _guard = self.claim(document_id)?;
        if pages.is_empty() {
            return Err(IngestError::NoPages(document_id));
        }

        info!(document_id, pages = pages.len(), "Ingesting document");
        let result = match prepare(pages).await {
            Ok(prepared) => self.store(document_id, &prepared).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(summary) => info!(
                document_id,
                pages = summary.page_count,
                tokens = summary.token_count,
                "Document ingested"
            ),
            Err(e) => warn!(
                document_id,
                page = ?e.page(),
                error = %e,
                "Ingestion rolled back"
            ),
        }
        result
    }

    /// Write every prepared page and finalize the document in one transaction.
    ///
    /// `BEGIN IMMEDIATE` takes the write lock before the first read. A
    /// deferred transaction would fail with `SQLITE_BUSY` on its first write
    /// if another connection committed after its initial read.
    async fn store(
        &self,
        document_id: i32,
        prepared: &PreparedDocument,
    ) -> Result<IngestSummary, IngestError> {
        let mut conn = self.pool.get().await?;
        conn.batch_execute("BEGIN IMMEDIATE").await?;

        let result = write_pages(&mut conn, document_id, prepared).await;
        let result = match result {
            Ok(summary) => match conn.batch_execute("COMMIT").await {
                Ok(()) => Ok(summary),
                Err(e) => Err(IngestError::Storage(e)),
            },
            Err(e) => Err(e),
        };

        if result.is_err() {
            if let Err(e) = conn.batch_execute("ROLLBACK").await {
                warn!(document_id, error = %e, "Rollback failed");
            }
        }
        result
    }
}

/// Pages decoded and tokenized ahead of the write transaction.
struct PreparedDocument {
    pages: Vec<PageAssets>,
    text: RunningText,
}

/// Load, tokenize and decode every page in order.
///
/// Nothing is written here; a failure names the page and leaves the database
/// untouched.
async fn prepare(pages: &[PageSource]) -> Result<PreparedDocument, IngestError> {
    let mut text = RunningText::new();
    let mut assets = Vec::with_capacity(pages.len());

    let mut page = 0u32;
    for source in pages {
        page += 1;
        let records = source.load_recognition(page).await?;
        let tokens = extract_tokens(&records, &mut text)
            .map_err(|source| IngestError::Extract { page, source })?;
        let image = source.load_image(page).await?;
        assets.push(PageAssets::decode(page, image, tokens)?);
    }

    Ok(PreparedDocument { pages: assets, text })
}

async fn write_pages(
    conn: &mut SqliteConn,
    document_id: i32,
    prepared: &PreparedDocument,
) -> Result<IngestSummary, IngestError> {
    let record = find_in(conn, document_id)
        .await?
        .ok_or(IngestError::DocumentNotFound(document_id))?;
    if record.processed {
        return Err(IngestError::AlreadyProcessed(document_id));
    }

    let mut token_count = 0;
    let mut page_count = 0u32;
    for assets in &prepared.pages {
        let page = page_count + 1;
        ingest_page(conn, document_id, page, assets).await?;
        token_count += assets.tokens.len();
        page_count = page;
    }

    if !finalize_in(conn, document_id, page_count, prepared.text.as_str()).await? {
        return Err(IngestError::DocumentNotFound(document_id));
    }
    debug!(document_id, "Document finalized, committing");

    Ok(IngestSummary {
        document_id,
        page_count,
        token_count,
        text_len: prepared.text.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::page::tests::png;
    use crate::ingest::tokens::tests::{boundary, page, word};
    use crate::models::Token;
    use crate::repository::DbContext;
    use std::time::Duration;
    use tempfile::tempdir;

    async fn setup() -> (DbContext, DocumentIngestionCoordinator, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let coordinator = DocumentIngestionCoordinator::new(ctx.pool().clone());
        (ctx, coordinator, dir)
    }

    fn memory(records: String) -> PageSource {
        PageSource::Memory {
            image: png(40, 60),
            recognition: records,
        }
    }

    #[tokio::test]
    async fn test_two_page_document() {
        let (ctx, coordinator, _dir) = setup().await;
        let id = ctx.documents().create("scan.pdf").await.unwrap();

        let pages = vec![
            memory(page(&[word("hello", 1, 1), boundary(), word("world", 1, 20)])),
            memory(page(&[word("foo", 1, 1)])),
        ];
        let summary = coordinator.ingest(id, &pages).await.unwrap();
        assert_eq!(
            summary,
            IngestSummary {
                document_id: id,
                page_count: 2,
                token_count: 3,
                text_len: 16,
            }
        );

        let doc = ctx.documents().get(id).await.unwrap().unwrap();
        assert!(doc.processed);
        assert_eq!(doc.page_count, Some(2));
        assert_eq!(doc.full_text.as_deref(), Some("hello world foo "));

        let stored = ctx.documents().get_page_tokens(id, 2).await.unwrap().unwrap();
        let tokens: Vec<Token> = serde_json::from_slice(&stored).unwrap();
        assert_eq!(tokens[0].character_start, 12);
        assert_eq!(tokens[0].line, 0);

        let first = ctx.documents().get_page(id, 1).await.unwrap().unwrap();
        assert_eq!(first.tokens[1].line, 1);
        assert_eq!((first.original_width, first.original_height), (40, 60));
    }

    #[tokio::test]
    async fn test_bad_page_rolls_back_everything() {
        let (ctx, coordinator, _dir) = setup().await;
        let id = ctx.documents().create("scan.pdf").await.unwrap();

        let pages = vec![
            memory(page(&[word("hello", 1, 1)])),
            memory(page(&["5\t1\t1\t1\t1\t1\t0\t0\twide\t10\t90\tx".to_string()])),
        ];
        let err = coordinator.ingest(id, &pages).await.unwrap_err();
        assert_eq!(err.page(), Some(2));

        let doc = ctx.documents().get(id).await.unwrap().unwrap();
        assert!(!doc.processed);
        assert_eq!(doc.page_count, None);
        assert_eq!(ctx.documents().count_pages(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_image_rolls_back() {
        let (ctx, coordinator, _dir) = setup().await;
        let id = ctx.documents().create("scan.pdf").await.unwrap();

        let pages = vec![
            memory(page(&[word("a", 1, 1)])),
            PageSource::Memory {
                image: b"garbage".to_vec(),
                recognition: page(&[word("b", 1, 1)]),
            },
        ];
        let err = coordinator.ingest(id, &pages).await.unwrap_err();
        assert_eq!(err.page(), Some(2));
        assert_eq!(ctx.documents().count_pages(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_and_processed_documents() {
        let (ctx, coordinator, _dir) = setup().await;
        let pages = vec![memory(page(&[word("a", 1, 1)]))];

        assert!(matches!(
            coordinator.ingest(99, &pages).await,
            Err(IngestError::DocumentNotFound(99))
        ));

        let id = ctx.documents().create("scan.pdf").await.unwrap();
        coordinator.ingest(id, &pages).await.unwrap();
        assert!(matches!(
            coordinator.ingest(id, &pages).await,
            Err(IngestError::AlreadyProcessed(_))
        ));
        assert_eq!(ctx.documents().count_pages(id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_no_pages_rejected() {
        let (ctx, coordinator, _dir) = setup().await;
        let id = ctx.documents().create("scan.pdf").await.unwrap();
        assert!(matches!(
            coordinator.ingest(id, &[]).await,
            Err(IngestError::NoPages(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_api_writes_proceed_while_pages_load() {
        let (ctx, coordinator, dir) = setup().await;
        let id = ctx.documents().create("scan.pdf").await.unwrap();

        // Reading page 2 blocks until the FIFO is fed below.
        let fifo = dir.path().join("page-2.tsv");
        let status = std::process::Command::new("mkfifo")
            .arg(&fifo)
            .status()
            .unwrap();
        assert!(status.success());
        let image = dir.path().join("page-2.png");
        std::fs::write(&image, png(40, 60)).unwrap();

        let pages = vec![
            memory(page(&[word("hello", 1, 1)])),
            PageSource::files(&image, &fifo),
        ];
        let running = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.ingest(id, &pages).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!running.is_finished());

        let topic_id = tokio::time::timeout(
            Duration::from_secs(1),
            ctx.annotations().create_topic("people"),
        )
        .await
        .expect("topic insert waited on ingestion")
        .unwrap();

        tokio::fs::write(&fifo, page(&[word("world", 1, 1)]))
            .await
            .unwrap();
        let summary = running.await.unwrap().unwrap();
        assert_eq!(summary.page_count, 2);

        let doc = ctx.documents().get(id).await.unwrap().unwrap();
        assert!(doc.processed);
        assert_eq!(doc.full_text.as_deref(), Some("hello world "));
        let topics = ctx.annotations().list_topics().await.unwrap();
        assert!(topics.iter().any(|t| t.id == topic_id && t.topic == "people"));
    }

    #[tokio::test]
    async fn test_ingest_waits_for_a_concurrent_writer() {
        let (ctx, coordinator, _dir) = setup().await;
        let id = ctx.documents().create("scan.pdf").await.unwrap();

        // Another connection holds the write lock briefly, then commits.
        let mut other = ctx.pool().get().await.unwrap();
        other.batch_execute("BEGIN IMMEDIATE").await.unwrap();
        other
            .batch_execute("INSERT INTO topics (topic) VALUES ('places')")
            .await
            .unwrap();

        let pages = vec![memory(page(&[word("a", 1, 1)]))];
        let running = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.ingest(id, &pages).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        other.batch_execute("COMMIT").await.unwrap();

        let summary = running.await.unwrap().unwrap();
        assert_eq!(summary.page_count, 1);
        assert_eq!(ctx.annotations().list_topics().await.unwrap().len(), 1);
        assert_eq!(ctx.documents().count_pages(id).await.unwrap(), 1);
    }

    #[test]
    fn test_same_document_is_exclusive() {
        let coordinator = DocumentIngestionCoordinator::new(DbPool::new(":memory:"));
        let guard = coordinator.claim(7).unwrap();
        assert!(matches!(
            coordinator.claim(7),
            Err(IngestError::AlreadyIngesting(7))
        ));
        assert!(coordinator.claim(8).is_ok());
        drop(guard);
        assert!(coordinator.claim(7).is_ok());
    }
}
