//! Topic endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::super::error::ApiError;
use super::super::AppState;
use crate::hub::Notification;
use crate::models::Topic;

#[derive(Debug, Deserialize)]
pub struct CreateTopicRequest {
    pub topic: String,
}

pub async fn list_topics(State(state): State<AppState>) -> Result<Json<Vec<Topic>>, ApiError> {
    Ok(Json(state.annotations.list_topics().await?))
}

pub async fn create_topic(
    State(state): State<AppState>,
    Json(body): Json<CreateTopicRequest>,
) -> Result<(StatusCode, Json<Topic>), ApiError> {
    let topic = body.topic.trim();
    if topic.is_empty() {
        return Err(ApiError::bad_request("Topic must not be empty"));
    }

    let id = state.annotations.create_topic(topic).await?;
    state.hub.notify(&Notification::TopicsChanged);

    Ok((
        StatusCode::CREATED,
        Json(Topic {
            id,
            topic: topic.to_string(),
        }),
    ))
}

/// Delete a topic. Annotations tagged with it are deleted too.
pub async fn delete_topic(
    State(state): State<AppState>,
    Path(topic_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    if !state.annotations.delete_topic(topic_id).await? {
        return Err(ApiError::not_found(format!("Topic {} not found", topic_id)));
    }

    state.hub.notify(&Notification::TopicsChanged);
    Ok(StatusCode::OK)
}
