//! List responses are wrapped in a `{count, next, previous, results}`
//! envelope, where `next`/`previous` locate the adjacent pages of the same
//! route.

use crate::server::ServerError;
use axum::{
    extract::{FromRequestParts, Query},
    http::Uri,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const DEFAULT_MAX_PAGE_SIZE: u64 = 100;

/// Raw `?page=&page_size=` query parameters. Pages are 1-based.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "PageParams::first_page")]
    pub page: u64,
    #[serde(default = "PageParams::default_page_size")]
    pub page_size: u64,
}

impl PageParams {
    fn first_page() -> u64 {
        1
    }

    fn default_page_size() -> u64 {
        DEFAULT_PAGE_SIZE
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: Self::first_page(),
            page_size: Self::default_page_size(),
        }
    }
}

#[derive(FromRequestParts, Deserialize, Debug, Clone, Copy, Default)]
#[from_request(via(Query), rejection(ServerError))]
pub struct PageQuery(pub PageParams);

/// Server-wide pagination limits, set from the environment.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct PaginationConfig {
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Error)]
pub enum InvalidPageError {
    #[error("Page numbers start at 1")]
    PageZero,
    #[error("Page size must be at least 1")]
    PageSizeZero,
}

/// A validated page selection. An oversized `page_size` is clamped to the
/// configured maximum rather than rejected; a page beyond the data yields an
/// empty result page, not an error.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Pager {
    page: u64,
    page_size: u64,
}

impl Pager {
    pub fn new(params: PageParams, config: PaginationConfig) -> Result<Self, InvalidPageError> {
        if params.page == 0 {
            return Err(InvalidPageError::PageZero);
        }
        if params.page_size == 0 {
            return Err(InvalidPageError::PageSizeZero);
        }

        Ok(Self {
            page: params.page,
            page_size: params.page_size.min(config.max_page_size),
        })
    }

    #[must_use]
    pub fn limit(self) -> i64 {
        i64::try_from(self.page_size).unwrap_or(i64::MAX)
    }

    #[must_use]
    pub fn offset(self) -> i64 {
        i64::try_from((self.page - 1).saturating_mul(self.page_size)).unwrap_or(i64::MAX)
    }

    /// Wraps one page of results in the envelope. `count` is the total
    /// across all pages; page `i` holds the window `[(i-1)k, ik)` of it.
    #[must_use]
    pub fn paginate<T>(self, results: Vec<T>, count: u64, base: &Uri) -> Page<T> {
        let next = (self.page.saturating_mul(self.page_size) < count)
            .then(|| self.locator(base, self.page + 1));
        let previous = (self.page > 1).then(|| self.locator(base, self.page - 1));

        Page {
            count,
            next,
            previous,
            results,
        }
    }

    fn locator(self, base: &Uri, page: u64) -> String {
        format!("{}?page={page}&page_size={}", base.path(), self.page_size)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

#[cfg(test)]
mod tests {
    use crate::server::pagination::{InvalidPageError, PageParams, Pager, PaginationConfig};
    use axum::http::Uri;

    fn pager(page: u64, page_size: u64) -> Pager {
        Pager::new(PageParams { page, page_size }, PaginationConfig::default()).unwrap()
    }

    #[test]
    fn offsets_cover_the_ith_window() {
        assert_eq!(pager(1, 10).offset(), 0);
        assert_eq!(pager(1, 10).limit(), 10);
        assert_eq!(pager(3, 10).offset(), 20);
        assert_eq!(pager(7, 3).offset(), 18);
    }

    #[test]
    fn zero_page_and_zero_size_are_rejected() {
        let config = PaginationConfig::default();
        assert_eq!(
            Pager::new(PageParams { page: 0, page_size: 10 }, config),
            Err(InvalidPageError::PageZero)
        );
        assert_eq!(
            Pager::new(PageParams { page: 1, page_size: 0 }, config),
            Err(InvalidPageError::PageSizeZero)
        );
    }

    #[test]
    fn oversized_page_size_is_clamped() {
        assert_eq!(pager(1, 100_000).limit(), 100);
    }

    #[test]
    fn middle_page_locates_both_neighbours() {
        let base = Uri::from_static("/posts");
        let page = pager(2, 10).paginate(vec![0; 10], 35, &base);

        assert_eq!(page.count, 35);
        assert_eq!(page.next.as_deref(), Some("/posts?page=3&page_size=10"));
        assert_eq!(page.previous.as_deref(), Some("/posts?page=1&page_size=10"));
    }

    #[test]
    fn first_page_has_no_previous() {
        let base = Uri::from_static("/feed");
        let page = pager(1, 10).paginate(vec![0; 10], 35, &base);

        assert!(page.previous.is_none());
        assert_eq!(page.next.as_deref(), Some("/feed?page=2&page_size=10"));
    }

    #[test]
    fn next_is_absent_once_everything_is_listed() {
        let base = Uri::from_static("/posts");

        // Exact boundary: 3 * 10 >= 30.
        let page = pager(3, 10).paginate(vec![0; 10], 30, &base);
        assert!(page.next.is_none());

        let page = pager(1, 10).paginate(Vec::<i32>::new(), 0, &base);
        assert!(page.next.is_none());
        assert!(page.previous.is_none());
        assert_eq!(page.count, 0);
    }

    #[test]
    fn envelope_omits_absent_locators() {
        let base = Uri::from_static("/groups");
        let page = pager(1, 10).paginate(vec![1, 2], 2, &base);

        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json, serde_json::json!({"count": 2, "results": [1, 2]}));
    }
}
