//! HTTP request handlers for the web server.

mod annotations;
mod documents;
mod topics;
mod upload;
mod ws;

// Re-export handlers for use by the router
pub use annotations::{create_annotation, delete_annotation, list_annotations};
pub use documents::{delete_document, get_document, list_documents, page_image, page_tokens};
pub use topics::{create_topic, delete_topic, list_topics};
pub use upload::upload_file;
pub use ws::websocket;
