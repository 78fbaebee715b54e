//! Page requests and list metadata.

use serde::{Deserialize, Serialize};

/// A normalized page request.
///
/// Out-of-range input is clamped rather than rejected: `page` is at least 1
/// and `limit` lies in `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Page used when none is requested.
    pub const DEFAULT_PAGE: u32 = 1;
    /// Page size used when none is requested.
    pub const DEFAULT_LIMIT: u32 = 20;
    /// Largest page size a client may request.
    pub const MAX_LIMIT: u32 = 100;

    /// Build a request from optional query parameters.
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(Self::DEFAULT_PAGE).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    /// One-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Page size.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Rows to skip, for SQL `OFFSET`.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    /// Metadata for a page of results drawn from `total` rows.
    #[must_use]
    pub fn meta(&self, total: i64) -> PageMeta {
        PageMeta::new(*self, total)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// The `meta` block of a paginated response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl PageMeta {
    /// Compute metadata; `total_pages` is `ceil(total / limit)`.
    #[must_use]
    pub fn new(request: PageRequest, total: i64) -> Self {
        let total = u64::try_from(total).unwrap_or(0);
        let limit = u64::from(request.limit);
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages: total.div_ceil(limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let req = PageRequest::default();
        assert_eq!((req.page(), req.limit()), (1, 20));
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_clamping() {
        let req = PageRequest::new(Some(0), Some(500));
        assert_eq!((req.page(), req.limit()), (1, 100));
        assert_eq!(PageRequest::new(None, Some(0)).limit(), 1);
    }

    #[test]
    fn test_second_page_of_45() {
        let req = PageRequest::new(Some(2), Some(20));
        assert_eq!(req.offset(), 20);

        let meta = req.meta(45);
        assert_eq!(meta.total, 45);
        assert_eq!(meta.total_pages, 3);
    }

    #[test]
    fn test_empty_result() {
        assert_eq!(PageRequest::default().meta(0).total_pages, 0);
    }

    #[test]
    fn test_exact_multiple() {
        assert_eq!(PageRequest::new(None, Some(10)).meta(40).total_pages, 4);
    }

    #[test]
    fn test_meta_wire_format() {
        let json = serde_json::to_value(PageRequest::default().meta(1)).ok();
        assert_eq!(
            json,
            Some(serde_json::json!({"page": 1, "limit": 20, "total": 1, "totalPages": 1}))
        );
    }
}
