//! Page-level models: the token index and the stored page record.

use serde::{Deserialize, Serialize};

/// Where a token sits on its page, in the source image's pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: u32,
    pub left: u32,
    pub right: u32,
    pub bottom: u32,
}

impl BoundingBox {
    /// Build a box from a recognition record's `left, top, width, height`.
    ///
    /// Returns `None` if `left + width` or `top + height` overflows.
    pub fn from_extent(left: u32, top: u32, width: u32, height: u32) -> Option<Self> {
        Some(Self {
            top,
            left,
            right: left.checked_add(width)?,
            bottom: top.checked_add(height)?,
        })
    }
}

/// A contiguous word: its span in the document-wide text, its page-local line
/// and its bounding box.
///
/// `character_start`/`character_end` address the document's `full_text`, not
/// the page, so they keep growing across pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub character_start: u32,
    pub character_end: u32,
    pub line: u32,
    pub bounding_box: BoundingBox,
}

/// A single stored page of a document.
#[derive(Debug, Clone)]
pub struct DocumentPage {
    pub document_id: i32,
    /// Page number (1-indexed).
    pub page_number: u32,
    pub original_width: u32,
    pub original_height: u32,
    pub image: Vec<u8>,
    /// Short format name such as `png`.
    pub image_format: String,
    pub tokens: Vec<Token>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_from_extent() {
        let bb = BoundingBox::from_extent(10, 20, 30, 5).unwrap();
        assert_eq!(
            bb,
            BoundingBox {
                top: 20,
                left: 10,
                right: 40,
                bottom: 25
            }
        );
    }

    #[test]
    fn test_bounding_box_overflow() {
        assert!(BoundingBox::from_extent(u32::MAX, 0, 1, 0).is_none());
        assert!(BoundingBox::from_extent(0, u32::MAX, 0, 1).is_none());
    }

    #[test]
    fn test_token_json_field_names() {
        let token = Token {
            character_start: 6,
            character_end: 11,
            line: 1,
            bounding_box: BoundingBox::from_extent(1, 2, 3, 4).unwrap(),
        };
        let json = serde_json::to_value(token).unwrap();
        assert_eq!(json["characterStart"], 6);
        assert_eq!(json["characterEnd"], 11);
        assert_eq!(json["line"], 1);
        assert_eq!(json["boundingBox"]["right"], 4);
        assert_eq!(json["boundingBox"]["bottom"], 6);
    }
}
