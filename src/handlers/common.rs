use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Common pagination query parameters. Pages are 1-based; `page_size` is
/// capped at 100.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PaginationParams {
    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    pub fn page_size(&self) -> u64 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

/// One page of results with navigation links, DRF-style.
#[derive(Debug, Serialize, ToSchema)]
pub struct Paginated<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub page: u64,
    pub page_size: u64,
    pub pages: u64,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn new(path: &str, params: PaginationParams, count: u64, results: Vec<T>) -> Self {
        let page = params.page();
        let page_size = params.page_size();
        let pages = count.div_ceil(page_size);

        let link = |p: u64| format!("{}?page={}&page_size={}", path, p, page_size);
        let next = (page < pages).then(|| link(page + 1));
        let previous = (page > 1 && count > 0).then(|| link(page - 1));

        Self {
            count,
            next,
            previous,
            page,
            page_size,
            pages,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_capped() {
        let params = PaginationParams {
            page: 0,
            page_size: 5000,
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn links_reflect_position() {
        let params = PaginationParams {
            page: 2,
            page_size: 10,
        };
        let page: Paginated<u32> = Paginated::new("/api/v1/payments", params, 35, vec![]);
        assert_eq!(page.pages, 4);
        assert_eq!(
            page.next.as_deref(),
            Some("/api/v1/payments?page=3&page_size=10")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("/api/v1/payments?page=1&page_size=10")
        );
    }

    #[test]
    fn single_page_has_no_links() {
        let page: Paginated<u32> =
            Paginated::new("/x", PaginationParams::default(), 3, vec![1, 2, 3]);
        assert_eq!(page.pages, 1);
        assert!(page.next.is_none());
        assert!(page.previous.is_none());
    }

    #[test]
    fn empty_result_set() {
        let page: Paginated<u32> = Paginated::new("/x", PaginationParams::default(), 0, vec![]);
        assert_eq!(page.pages, 0);
        assert!(page.next.is_none());
        assert!(page.previous.is_none());
    }
}
