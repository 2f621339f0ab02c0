use serde::Deserialize;
use serde::Serialize;

/// JSON wrapper returned by every endpoint.
///
/// Single-resource endpoints fill `data` with one value, collection endpoints
/// fill it with an array and also send `pagination`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub page_size: u32,
    pub total_items: u64,
}

impl Pagination {
    pub fn is_last_page(&self) -> bool {
        self.current_page >= self.total_pages
    }

    /// Page to request after this one, or `None` when this was the last page.
    pub fn next_page(&self) -> Option<u32> {
        if self.is_last_page() {
            None
        } else {
            Some(self.current_page.saturating_add(1))
        }
    }
}

/// One decoded page of a collection endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}
