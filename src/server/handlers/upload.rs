//! Raw file upload feeding the ingestion queue.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::super::error::ApiError;
use super::super::AppState;
use crate::ingest::UploadCompleted;

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: Option<String>,
}

/// Store the request body and queue it for ingestion.
pub async fn upload_file(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request("Empty upload"));
    }

    let display_name = params
        .filename
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "untitled".to_string());

    let upload_id = uuid::Uuid::new_v4();
    tokio::fs::create_dir_all(&state.upload_dir).await?;
    let path = state.upload_dir.join(upload_id.to_string());
    tokio::fs::write(&path, &body).await?;

    tracing::info!(upload = %upload_id, name = %display_name, bytes = body.len(), "Upload received");
    let upload = UploadCompleted {
        path: path.clone(),
        display_name,
    };
    if let Err(e) = state.uploads.submit(upload).await {
        if let Err(err) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), error = %err, "Failed to remove unqueued upload");
        }
        return Err(e.into());
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "upload": upload_id.to_string() })),
    ))
}
