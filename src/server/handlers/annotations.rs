//! Annotation endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::super::error::ApiError;
use super::super::AppState;
use crate::hub::Notification;
use crate::models::{Annotation, NewAnnotation};

pub async fn list_annotations(
    State(state): State<AppState>,
    Path(document_id): Path<i32>,
) -> Result<Json<Vec<Annotation>>, ApiError> {
    Ok(Json(state.annotations.list_for_document(document_id).await?))
}

/// Create an annotation; its text is cut from the document's full text.
pub async fn create_annotation(
    State(state): State<AppState>,
    Path(document_id): Path<i32>,
    Json(body): Json<NewAnnotation>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let doc = state
        .documents
        .get(document_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Document {} not found", document_id)))?;

    if !doc.processed {
        return Err(ApiError::bad_request("Document is not processed yet"));
    }
    if body.character_start >= body.character_end {
        return Err(ApiError::bad_request("Empty character range"));
    }
    let page_count = doc.page_count.unwrap_or(0);
    if body.page_start == 0 || body.page_start > body.page_end || body.page_end > page_count {
        return Err(ApiError::bad_request("Invalid page range"));
    }

    let text = doc
        .text_range(body.character_start, body.character_end)
        .ok_or_else(|| ApiError::bad_request("Character range out of bounds"))?;

    let annotation_id = state.annotations.create(document_id, &body, &text).await?;
    state
        .hub
        .notify(&Notification::AnnotationsChanged { document_id });

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "annotationId": annotation_id })),
    ))
}

pub async fn delete_annotation(
    State(state): State<AppState>,
    Path((document_id, annotation_id)): Path<(i32, i32)>,
) -> Result<StatusCode, ApiError> {
    if !state.annotations.delete(document_id, annotation_id).await? {
        return Err(ApiError::not_found(format!(
            "Annotation {} not found",
            annotation_id
        )));
    }

    state
        .hub
        .notify(&Notification::AnnotationsChanged { document_id });
    Ok(StatusCode::OK)
}
