//! Diesel ORM records for database tables.

use diesel::prelude::*;

use crate::schema;

/// Document record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::documents)]
#[diesel(primary_key(document_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DocumentRecord {
    pub document_id: i32,
    pub name: String,
    pub pages: Option<i32>,
    pub text: Option<String>,
    pub processed: bool,
}

/// New document for insertion. Page count and text are filled in by ingestion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::documents)]
pub struct NewDocument<'a> {
    pub name: &'a str,
    pub processed: bool,
}

/// New page for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::document_pages)]
pub struct NewDocumentPage<'a> {
    pub document_id: i32,
    pub page: i32,
    pub height: i32,
    pub width: i32,
    pub image: &'a [u8],
    pub image_format: &'a str,
    pub tokens: &'a [u8],
}

/// Page record from the database.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::document_pages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DocumentPageRecord {
    pub document_page_id: i32,
    pub document_id: i32,
    pub page: i32,
    pub height: i32,
    pub width: i32,
    pub image: Vec<u8>,
    pub image_format: String,
    pub tokens: Vec<u8>,
}

/// Topic record from the database.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::topics)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TopicRecord {
    pub topic_id: i32,
    pub topic: String,
}

/// Annotation record from the database.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::annotations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AnnotationRecord {
    pub annotation_id: i32,
    pub document_id: i32,
    pub character_start: i32,
    pub character_end: i32,
    pub page_start: i32,
    pub page_end: i32,
    pub text: String,
    pub top_px: i32,
    pub left_px: i32,
    pub topic_id: i32,
}

/// New annotation for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::annotations)]
pub struct NewAnnotationRecord<'a> {
    pub document_id: i32,
    pub character_start: i32,
    pub character_end: i32,
    pub page_start: i32,
    pub page_end: i32,
    pub text: &'a str,
    pub top_px: i32,
    pub left_px: i32,
    pub topic_id: i32,
}

#[derive(QueryableByName)]
pub(crate) struct LastInsertRowId {
    #[diesel(sql_type = diesel::sql_types::BigInt, column_name = "last_insert_rowid()")]
    pub id: i64,
}
