//! Annotation and topic persistence. Plain CRUD; each call is one statement.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{AnnotationRecord, LastInsertRowId, NewAnnotationRecord, TopicRecord};
use super::pool::{DbError, DbPool};
use super::util::{from_sql_int, to_diesel_error, to_sql_int};
use crate::models::{Annotation, NewAnnotation, Topic};
use crate::schema::{annotations, topics};

/// Annotation and topic repository.
#[derive(Clone, Debug)]
pub struct AnnotationRepository {
    pool: DbPool,
}

impl AnnotationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// All topics.
    pub async fn list_topics(&self) -> Result<Vec<Topic>, DbError> {
        let mut conn = self.pool.get().await?;

        let records: Vec<TopicRecord> = topics::table
            .order(topics::topic_id.asc())
            .select(TopicRecord::as_select())
            .load(&mut conn)
            .await?;

        Ok(records
            .into_iter()
            .map(|r| Topic {
                id: r.topic_id,
                topic: r.topic,
            })
            .collect())
    }

    /// Create a topic and return its id.
    pub async fn create_topic(&self, topic: &str) -> Result<i32, DbError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(topics::table)
            .values(topics::topic.eq(topic))
            .execute(&mut conn)
            .await?;
        let row: LastInsertRowId = diesel::sql_query("SELECT last_insert_rowid()")
            .get_result(&mut conn)
            .await?;

        i32::try_from(row.id).map_err(to_diesel_error)
    }

    /// Delete a topic together with the annotations using it.
    pub async fn delete_topic(&self, topic_id: i32) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;
        let rows = diesel::delete(topics::table.find(topic_id))
            .execute(&mut conn)
            .await?;
        Ok(rows > 0)
    }

    /// Annotations of a document ordered by span.
    pub async fn list_for_document(&self, document_id: i32) -> Result<Vec<Annotation>, DbError> {
        let mut conn = self.pool.get().await?;

        let rows: Vec<(AnnotationRecord, String)> = annotations::table
            .inner_join(topics::table)
            .filter(annotations::document_id.eq(document_id))
            .order((
                annotations::character_start.asc(),
                annotations::character_end.asc(),
            ))
            .select((AnnotationRecord::as_select(), topics::topic))
            .load(&mut conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(r, topic)| Annotation {
                annotation_id: r.annotation_id,
                character_start: from_sql_int(r.character_start),
                character_end: from_sql_int(r.character_end),
                page_start: from_sql_int(r.page_start),
                page_end: from_sql_int(r.page_end),
                top: from_sql_int(r.top_px),
                left: from_sql_int(r.left_px),
                topic_id: r.topic_id,
                topic,
                text: r.text,
            })
            .collect())
    }

    /// Store an annotation with its resolved text.
    pub async fn create(
        &self,
        document_id: i32,
        annotation: &NewAnnotation,
        text: &str,
    ) -> Result<i32, DbError> {
        let record = NewAnnotationRecord {
            document_id,
            character_start: to_sql_int(annotation.character_start)?,
            character_end: to_sql_int(annotation.character_end)?,
            page_start: to_sql_int(annotation.page_start)?,
            page_end: to_sql_int(annotation.page_end)?,
            text,
            top_px: to_sql_int(annotation.top)?,
            left_px: to_sql_int(annotation.left)?,
            topic_id: annotation.topic_id,
        };

        let mut conn = self.pool.get().await?;
        diesel::insert_into(annotations::table)
            .values(&record)
            .execute(&mut conn)
            .await?;
        let row: LastInsertRowId = diesel::sql_query("SELECT last_insert_rowid()")
            .get_result(&mut conn)
            .await?;

        i32::try_from(row.id).map_err(to_diesel_error)
    }

    /// Delete one annotation of a document.
    pub async fn delete(&self, document_id: i32, annotation_id: i32) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;
        let rows = diesel::delete(
            annotations::table
                .filter(annotations::document_id.eq(document_id))
                .filter(annotations::annotation_id.eq(annotation_id)),
        )
        .execute(&mut conn)
        .await?;
        Ok(rows > 0)
    }
}
