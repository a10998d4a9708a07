//! Document and page persistence.
//!
//! Repository methods open their own connection and run a single statement,
//! so readers may observe a document mid-ingestion (`processed = false`, no
//! pages yet). The module-level `*_in` functions instead run on a caller
//! supplied connection and therefore join the caller's open transaction;
//! ingestion uses those.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{
    DocumentPageRecord, DocumentRecord, LastInsertRowId, NewDocument, NewDocumentPage,
};
use super::pool::{DbError, DbPool, SqliteConn};
use super::util::{from_sql_int, to_diesel_error, to_sql_int};
use crate::models::{Document, DocumentPage, DocumentSummary, PageSummary, Token};
use crate::schema::{document_pages, documents};

/// Document repository.
#[derive(Clone, Debug)]
pub struct DocumentRepository {
    pool: DbPool,
}

impl DocumentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new, unprocessed document row and return its id.
    pub async fn create(&self, name: &str) -> Result<i32, DbError> {
        let mut conn = self.pool.get().await?;
        create_in(&mut conn, name).await
    }

    /// List all documents, oldest first.
    pub async fn list(&self) -> Result<Vec<DocumentSummary>, DbError> {
        let mut conn = self.pool.get().await?;

        let rows: Vec<(i32, String, Option<i32>, bool)> = documents::table
            .select((
                documents::document_id,
                documents::name,
                documents::pages,
                documents::processed,
            ))
            .order(documents::document_id.asc())
            .load(&mut conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, pages, processed)| DocumentSummary {
                id,
                name,
                pages: pages.map(from_sql_int).unwrap_or(0),
                processed,
            })
            .collect())
    }

    /// Get a document by id.
    pub async fn get(&self, id: i32) -> Result<Option<Document>, DbError> {
        let mut conn = self.pool.get().await?;
        Ok(find_in(&mut conn, id).await?.map(Document::from))
    }

    /// Delete a document. Pages and annotations go with it.
    pub async fn delete(&self, id: i32) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::delete(documents::table.find(id))
            .execute(&mut conn)
            .await?;

        Ok(rows > 0)
    }

    /// Count stored pages for a document.
    pub async fn count_pages(&self, document_id: i32) -> Result<u32, DbError> {
        use diesel::dsl::count_star;

        let mut conn = self.pool.get().await?;
        let count: i64 = document_pages::table
            .filter(document_pages::document_id.eq(document_id))
            .select(count_star())
            .first(&mut conn)
            .await?;

        Ok(count as u32)
    }

    /// Page dimensions for a document, in page order.
    pub async fn get_pages(&self, document_id: i32) -> Result<Vec<PageSummary>, DbError> {
        let mut conn = self.pool.get().await?;

        let rows: Vec<(i32, i32, i32)> = document_pages::table
            .filter(document_pages::document_id.eq(document_id))
            .order(document_pages::page.asc())
            .select((
                document_pages::page,
                document_pages::width,
                document_pages::height,
            ))
            .load(&mut conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(page, width, height)| PageSummary {
                page_number: from_sql_int(page),
                original_width: from_sql_int(width),
                original_height: from_sql_int(height),
            })
            .collect())
    }

    /// Raw encoded token index of a page, exactly as stored.
    pub async fn get_page_tokens(
        &self,
        document_id: i32,
        page: u32,
    ) -> Result<Option<Vec<u8>>, DbError> {
        let mut conn = self.pool.get().await?;

        document_pages::table
            .filter(document_pages::document_id.eq(document_id))
            .filter(document_pages::page.eq(to_sql_int(page)?))
            .select(document_pages::tokens)
            .first(&mut conn)
            .await
            .optional()
    }

    /// Page image bytes and their format name.
    pub async fn get_page_image(
        &self,
        document_id: i32,
        page: u32,
    ) -> Result<Option<(Vec<u8>, String)>, DbError> {
        let mut conn = self.pool.get().await?;

        document_pages::table
            .filter(document_pages::document_id.eq(document_id))
            .filter(document_pages::page.eq(to_sql_int(page)?))
            .select((document_pages::image, document_pages::image_format))
            .first(&mut conn)
            .await
            .optional()
    }

    /// Load a full page with its decoded token index.
    pub async fn get_page(
        &self,
        document_id: i32,
        page: u32,
    ) -> Result<Option<DocumentPage>, DbError> {
        let mut conn = self.pool.get().await?;

        let record: Option<DocumentPageRecord> = document_pages::table
            .filter(document_pages::document_id.eq(document_id))
            .filter(document_pages::page.eq(to_sql_int(page)?))
            .select(DocumentPageRecord::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        record
            .map(|r| {
                let tokens: Vec<Token> =
                    serde_json::from_slice(&r.tokens).map_err(to_diesel_error)?;
                Ok(DocumentPage {
                    document_id: r.document_id,
                    page_number: from_sql_int(r.page),
                    original_width: from_sql_int(r.width),
                    original_height: from_sql_int(r.height),
                    image: r.image,
                    image_format: r.image_format,
                    tokens,
                })
            })
            .transpose()
    }
}

impl From<DocumentRecord> for Document {
    fn from(r: DocumentRecord) -> Self {
        Self {
            id: r.document_id,
            name: r.name,
            page_count: r.pages.map(from_sql_int),
            full_text: r.text,
            processed: r.processed,
        }
    }
}

/// Insert a document row on the given connection.
pub async fn create_in(conn: &mut SqliteConn, name: &str) -> Result<i32, DbError> {
    diesel::insert_into(documents::table)
        .values(&NewDocument {
            name,
            processed: false,
        })
        .execute(conn)
        .await?;

    let row: LastInsertRowId = diesel::sql_query("SELECT last_insert_rowid()")
        .get_result(conn)
        .await?;

    i32::try_from(row.id).map_err(to_diesel_error)
}

/// Look a document up on the given connection.
pub async fn find_in(conn: &mut SqliteConn, id: i32) -> Result<Option<DocumentRecord>, DbError> {
    documents::table
        .find(id)
        .select(DocumentRecord::as_select())
        .first(conn)
        .await
        .optional()
}

/// Insert one page row on the given connection.
pub async fn insert_page_in(conn: &mut SqliteConn, page: &NewDocumentPage<'_>) -> Result<(), DbError> {
    diesel::insert_into(document_pages::table)
        .values(page)
        .execute(conn)
        .await?;
    Ok(())
}

/// Record the final page count and text and mark the document processed.
///
/// Returns `false` if no document row matched.
pub async fn finalize_in(
    conn: &mut SqliteConn,
    id: i32,
    page_count: u32,
    text: &str,
) -> Result<bool, DbError> {
    let rows = diesel::update(documents::table.find(id))
        .set((
            documents::pages.eq(Some(to_sql_int(page_count)?)),
            documents::text.eq(Some(text)),
            documents::processed.eq(true),
        ))
        .execute(conn)
        .await?;

    Ok(rows > 0)
}
