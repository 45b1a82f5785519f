//! Page navigation state for paginated listings.

use crate::models::Page;

/// Current page plus the items and totals of the last loaded page.
///
/// Navigation methods return `true` when the current page changed, which is
/// the caller's cue to fetch.
#[derive(Debug, Clone)]
pub struct Pagination<T> {
    current_page: u32,
    items: Vec<T>,
    page_size: u32,
    total: u64,
    loaded: bool,
}

impl<T> Pagination<T> {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(page: u32) -> Self {
        Self {
            current_page: page.max(1),
            items: Vec::new(),
            page_size: 0,
            total: 0,
            loaded: false,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// `ceil(total / page_size)`; 1 until a page has been loaded.
    pub fn total_pages(&self) -> u32 {
        if !self.loaded || self.page_size == 0 {
            return 1;
        }
        let pages = self.total.div_ceil(u64::from(self.page_size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_next_page(&self) -> bool {
        self.current_page < self.total_pages()
    }

    pub fn has_previous_page(&self) -> bool {
        self.current_page > 1
    }

    /// Take the items and totals from an API page.
    pub fn set_page_data(&mut self, page: Page<T>) {
        self.items = page.data;
        self.page_size = page.page_size;
        self.total = page.total;
        self.loaded = true;
    }

    /// Back to page 1, e.g. after the search text changed.
    pub fn reset_page(&mut self) {
        self.current_page = 1;
    }

    /// Move to `page` if it lies within `1..=total_pages`.
    pub fn go_to_page(&mut self, page: u32) -> bool {
        if page < 1 || page > self.total_pages() {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.has_next_page() && self.go_to_page(self.current_page + 1)
    }

    pub fn previous_page(&mut self) -> bool {
        self.has_previous_page() && self.go_to_page(self.current_page - 1)
    }
}

impl<T> Default for Pagination<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(total: u64) -> Page<u64> {
        Page {
            data: (1..=6).collect(),
            page: 1,
            page_size: 6,
            total,
        }
    }

    #[test]
    fn single_page_before_any_data() {
        let pagination = Pagination::<u64>::new();
        assert_eq!(pagination.current_page(), 1);
        assert_eq!(pagination.total_pages(), 1);
        assert!(!pagination.has_next_page());
        assert!(!pagination.has_previous_page());
    }

    #[test]
    fn total_pages_rounds_up() {
        let mut pagination = Pagination::new();
        pagination.set_page_data(page(30));
        assert_eq!(pagination.total_pages(), 5);
        pagination.set_page_data(page(31));
        assert_eq!(pagination.total_pages(), 6);
        pagination.set_page_data(page(0));
        assert_eq!(pagination.total_pages(), 0);
        assert_eq!(pagination.items().len(), 6);
    }

    #[test]
    fn go_to_page_is_bounds_checked() {
        let mut pagination = Pagination::new();
        pagination.set_page_data(page(13));

        assert!(!pagination.go_to_page(0));
        assert!(!pagination.go_to_page(4));
        assert!(pagination.go_to_page(3));
        assert_eq!(pagination.current_page(), 3);
        assert!(!pagination.has_next_page());
    }

    #[test]
    fn next_and_previous_stop_at_the_edges() {
        let mut pagination = Pagination::new();
        pagination.set_page_data(page(12));

        assert!(!pagination.previous_page());
        assert!(pagination.next_page());
        assert!(!pagination.next_page());
        assert_eq!(pagination.current_page(), 2);
        assert!(pagination.previous_page());
        assert_eq!(pagination.current_page(), 1);
    }

    #[test]
    fn reset_returns_to_first_page() {
        let mut pagination = Pagination::new();
        pagination.set_page_data(page(30));
        pagination.go_to_page(4);
        pagination.reset_page();
        assert_eq!(pagination.current_page(), 1);
        assert!(pagination.has_next_page());
    }
}
