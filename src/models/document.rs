//! Document models.

use serde::{Deserialize, Serialize};

/// A scanned document.
///
/// `page_count` and `full_text` stay unset until ingestion commits; until then
/// `processed` is false and no page is queryable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: i32,
    pub name: String,
    pub page_count: Option<u32>,
    pub full_text: Option<String>,
    pub processed: bool,
}

impl Document {
    /// Slice `[start, end)` out of the document text, counting characters.
    ///
    /// Returns `None` for unprocessed documents and out-of-range spans.
    pub fn text_range(&self, start: u32, end: u32) -> Option<String> {
        let text = self.full_text.as_deref().filter(|_| self.processed)?;
        if start > end {
            return None;
        }
        let (start, end) = (start as usize, end as usize);
        let slice: String = text.chars().skip(start).take(end - start).collect();
        if slice.chars().count() != end - start {
            return None;
        }
        Some(slice)
    }
}

/// Row of the document listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: i32,
    pub name: String,
    /// Page count, 0 while the document is not processed.
    pub pages: u32,
    pub processed: bool,
}

/// Page metadata as listed in a document detail response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub page_number: u32,
    pub original_width: u32,
    pub original_height: u32,
}
