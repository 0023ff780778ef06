//! Page slicing for expense, category and template lists
//!
//! Repositories fetch one page with `LIMIT/OFFSET` and read the full count from
//! `COUNT(*) OVER()`; handlers turn the result into a [`PageResponse`].

use expensectl_core::{page_range, PageItem};
use serde::{Deserialize, Serialize};

/// Upper bound for `per_page` from the query string
const MAX_PER_PAGE: u32 = 100;

/// Page size when neither the request nor the config sets one
pub const DEFAULT_PER_PAGE: u32 = 25;

/// Requested page, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, DEFAULT_PER_PAGE)
    }
}

/// One page of rows plus the overall row count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Paginated<T> {
    pub fn from_page(items: Vec<T>, total: i64, page: Pagination) -> Self {
        Self {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        }
    }

    /// At least one page, even for an empty list.
    pub fn total_pages(&self) -> u32 {
        let total = u32::try_from(self.total.max(0)).unwrap_or(u32::MAX);
        total.div_ceil(self.per_page.max(1)).max(1)
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }

    pub fn into_response(self) -> PageResponse<T> {
        let total_pages = self.total_pages();
        PageResponse {
            pages: page_range(self.page, total_pages),
            total_pages,
            has_next: self.page < total_pages,
            has_prev: self.page > 1,
            items: self.items,
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// List body returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
    /// Page links for the list footer, `"..."` marking gaps
    pub pages: Vec<PageItem>,
}

/// `?page=&per_page=`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PaginationParams {
    /// Fill a missing `per_page` from the configured list size.
    pub fn with_default(self, per_page: u32) -> Pagination {
        Pagination::new(self.page.unwrap_or(1), self.per_page.unwrap_or(per_page))
    }
}
