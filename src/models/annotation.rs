//! Annotation and topic models.

use serde::{Deserialize, Serialize};

/// A highlighted span of a document, tagged with a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub annotation_id: i32,
    pub character_start: u32,
    pub character_end: u32,
    pub page_start: u32,
    pub page_end: u32,
    pub top: u32,
    pub left: u32,
    pub topic_id: i32,
    pub topic: String,
    pub text: String,
}

/// Annotation as submitted by a client; the text is resolved server-side.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnnotation {
    pub character_start: u32,
    pub character_end: u32,
    pub page_start: u32,
    pub page_end: u32,
    #[serde(default)]
    pub top: u32,
    #[serde(default)]
    pub left: u32,
    pub topic_id: i32,
}

/// A kind of annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i32,
    pub topic: String,
}
