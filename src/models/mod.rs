//! Data models for spectator.

mod annotation;
mod document;
mod document_page;

pub use annotation::{Annotation, NewAnnotation, Topic};
pub use document::{Document, DocumentSummary, PageSummary};
pub use document_page::{BoundingBox, DocumentPage, Token};
