//! Listing parameters and pagination utilities

use crate::config::PaginationConfig;
use serde::{Deserialize, Serialize};

/// Query parameters of the shop listing
///
/// Extracted from the URL query string. Sorting takes precedence over the
/// filters; see [`crate::core::filter::resolve_shop_query`].
///
/// # Example
/// ```text
/// GET /shops?page=0&size=9
/// GET /shops?page=0&size=9&sortBy=name
/// GET /shops?page=1&size=20&inVacations=true&createdAfter=2024-01-01
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopListParams {
    /// Page number (starts at 0)
    #[serde(default)]
    pub page: usize,

    /// Number of items per page; the configured default when absent
    pub size: Option<usize>,

    /// `name`, `createdAt`, anything else sorts by product count
    pub sort_by: Option<String>,

    pub in_vacations: Option<bool>,

    /// `YYYY-MM-DD`, exclusive upper bound
    pub created_before: Option<String>,

    /// `YYYY-MM-DD`, exclusive lower bound
    pub created_after: Option<String>,
}

impl ShopListParams {
    /// Resolve the page request, clamping the size to the configured bounds
    pub fn page_request(&self, config: &PaginationConfig) -> PageRequest {
        let size = self
            .size
            .unwrap_or(config.default_size)
            .clamp(1, config.max_size.max(1));
        PageRequest::new(self.page, size)
    }
}

/// Zero-based page descriptor handed to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    pub fn new(page: usize, size: usize) -> Self {
        Self {
            page,
            size: size.max(1),
        }
    }

    /// Number of rows to skip
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

/// One page of results plus the total row count
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub request: PageRequest,
}

impl<T> Page<T> {
    /// Cut a page out of an already filtered and ordered collection
    pub fn from_sorted(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len();
        let items = all
            .into_iter()
            .skip(request.offset())
            .take(request.size)
            .collect();
        Self {
            items,
            total,
            request,
        }
    }

    pub fn into_response(self) -> PaginatedResponse<T> {
        PaginatedResponse {
            pagination: PaginationMeta::new(self.request.page, self.request.size, self.total),
            data: self.items,
        }
    }
}

/// Paginated response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    /// The paginated data
    pub data: Vec<T>,

    /// Pagination metadata
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Current page number (starts at 0)
    pub page: usize,

    /// Number of items per page
    pub size: usize,

    /// Total number of items (after filters)
    pub total: usize,

    /// Total number of pages
    pub total_pages: usize,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: usize, size: usize, total: usize) -> Self {
        let size = size.max(1);
        let total_pages = total.div_ceil(size);
        let start = page.saturating_mul(size);

        Self {
            page,
            size,
            total,
            total_pages,
            has_next: start.saturating_add(size) < total,
            has_prev: page > 0,
        }
    }
}
