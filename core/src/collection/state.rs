use quotebook_backend_client::ApiError;
use quotebook_protocol::Entity;
use quotebook_protocol::Pagination;

/// Number of trailing items that trigger loading the next page.
pub const PREFETCH_WINDOW: usize = 3;

/// Observable snapshot of one paginated collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionState<E> {
    /// Loaded items, unique by id.
    pub items: Vec<E>,
    /// Next page to request, 1-based.
    pub cursor: u32,
    pub is_last_page: bool,
    pub is_loading: bool,
    pub last_error: Option<ApiError>,
    pub pagination: Option<Pagination>,
    /// Change events were dropped; `items` may be out of date until the next
    /// refresh.
    pub is_stale: bool,
}

impl<E> Default for CollectionState<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            cursor: 1,
            is_last_page: false,
            is_loading: false,
            last_error: None,
            pagination: None,
            is_stale: false,
        }
    }
}

impl<E: Entity> CollectionState<E> {
    pub fn can_load_more(&self) -> bool {
        !self.is_loading && !self.is_last_page
    }

    /// True when `item` is among the last [`PREFETCH_WINDOW`] items.
    pub fn is_near_end(&self, item: &E) -> bool {
        self.items
            .iter()
            .rev()
            .take(PREFETCH_WINDOW)
            .any(|candidate| candidate.id() == item.id())
    }
}
