//! Document listing, detail, deletion and page assets.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::super::error::ApiError;
use super::super::AppState;
use crate::hub::Notification;
use crate::models::DocumentSummary;

/// Page entry of a document detail response.
#[derive(Debug, Serialize)]
pub struct PageLinks {
    #[serde(rename = "originalHeight")]
    pub original_height: u32,
    #[serde(rename = "originalWidth")]
    pub original_width: u32,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    #[serde(rename = "tokensURL")]
    pub tokens_url: String,
}

/// Document detail response.
#[derive(Debug, Serialize)]
pub struct DocumentDetail {
    pub id: i32,
    pub name: String,
    pub pages: Vec<PageLinks>,
}

/// List every document, processed or not.
pub async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentSummary>>, ApiError> {
    Ok(Json(state.documents.list().await?))
}

/// Document name plus its pages. Pages of an unprocessed document are not
/// visible yet, so that list is empty until ingestion commits.
pub async fn get_document(
    State(state): State<AppState>,
    Path(document_id): Path<i32>,
) -> Result<Json<DocumentDetail>, ApiError> {
    let doc = state
        .documents
        .get(document_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Document {} not found", document_id)))?;

    let pages = state
        .documents
        .get_pages(document_id)
        .await?
        .into_iter()
        .map(|p| PageLinks {
            original_height: p.original_height,
            original_width: p.original_width,
            image_url: format!("/document/{}/page/{}/image", document_id, p.page_number),
            tokens_url: format!("/document/{}/page/{}/tokens", document_id, p.page_number),
        })
        .collect();

    Ok(Json(DocumentDetail {
        id: doc.id,
        name: doc.name,
        pages,
    }))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    if !state.documents.delete(document_id).await? {
        return Err(ApiError::not_found(format!(
            "Document {} not found",
            document_id
        )));
    }

    tracing::info!(document_id, "Deleted document");
    state.hub.notify(&Notification::DocumentsChanged);
    Ok(StatusCode::OK)
}

/// The stored token index of a page, sent as-is.
pub async fn page_tokens(
    State(state): State<AppState>,
    Path((document_id, page)): Path<(i32, u32)>,
) -> Result<Response, ApiError> {
    let tokens = state
        .documents
        .get_page_tokens(document_id, page)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Page {} not found", page)))?;

    Ok((
        [(header::CONTENT_TYPE, "application/json; charset=UTF-8")],
        tokens,
    )
        .into_response())
}

pub async fn page_image(
    State(state): State<AppState>,
    Path((document_id, page)): Path<(i32, u32)>,
) -> Result<Response, ApiError> {
    let (image, format) = state
        .documents
        .get_page_image(document_id, page)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Page {} not found", page)))?;

    let mime = image::ImageFormat::from_extension(&format)
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream");

    Ok(([(header::CONTENT_TYPE, mime)], image).into_response())
}
