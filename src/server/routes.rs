//! Router configuration for the web server.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    let web_dir = state.web_dir.clone();
    let max_upload_bytes = state.max_upload_bytes;

    let router = Router::new()
        // Documents
        .route("/documents", get(handlers::list_documents))
        .route(
            "/document/:document_id",
            get(handlers::get_document).delete(handlers::delete_document),
        )
        .route(
            "/document/:document_id/page/:page/tokens",
            get(handlers::page_tokens),
        )
        .route(
            "/document/:document_id/page/:page/image",
            get(handlers::page_image),
        )
        // Annotations
        .route(
            "/document/:document_id/annotations",
            get(handlers::list_annotations).post(handlers::create_annotation),
        )
        .route(
            "/document/:document_id/annotation/:annotation_id",
            delete(handlers::delete_annotation),
        )
        // Topics
        .route(
            "/topics",
            get(handlers::list_topics).post(handlers::create_topic),
        )
        .route("/topic/:topic_id", delete(handlers::delete_topic))
        // Uploads and live updates
        .route(
            "/files",
            post(handlers::upload_file).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/ws", get(handlers::websocket));

    // Client build, with index.html for client-side routes
    let router = match web_dir {
        Some(dir) => {
            let index = dir.join("index.html");
            router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)))
        }
        None => router,
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
