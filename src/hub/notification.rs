//! State-change messages pushed to live viewers.

use serde_json::json;

/// A change clients should react to by refetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    DocumentsChanged,
    TopicsChanged,
    AnnotationsChanged { document_id: i32 },
}

impl Notification {
    /// The JSON text sent over the wire.
    pub fn to_message(&self) -> String {
        let value = match self {
            Self::DocumentsChanged => json!({ "type": "documentsChanged" }),
            Self::TopicsChanged => json!({ "type": "topicsChanged" }),
            Self::AnnotationsChanged { document_id } => json!({
                "type": "annotationsChanged",
                "documentId": document_id,
            }),
        };
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            Notification::DocumentsChanged.to_message(),
            r#"{"type":"documentsChanged"}"#
        );
        assert_eq!(
            Notification::TopicsChanged.to_message(),
            r#"{"type":"topicsChanged"}"#
        );

        let value: serde_json::Value = serde_json::from_str(
            &Notification::AnnotationsChanged { document_id: 3 }.to_message(),
        )
        .unwrap();
        assert_eq!(value["type"], "annotationsChanged");
        assert_eq!(value["documentId"], 3);
    }
}
