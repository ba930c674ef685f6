//! Pagination utilities

use serde::Serialize;

/// Default page size when the request does not specify one
pub const DEFAULT_LIMIT: i64 = 10;

/// Upper bound on requested page size
pub const MAX_LIMIT: i64 = 100;

/// Requested page, before sanitization
#[derive(Debug, Clone, Copy)]
pub struct PageQuery {
    pub page: i64,
    pub limit: i64,
}

/// Sanitized window for a SQL LIMIT/OFFSET query
#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub page: i64,
    pub limit: i64,
    pub offset: i64,
}

impl PageQuery {
    /// Clamp page/limit to valid bounds and compute the row offset
    pub fn window(&self) -> Window {
        let page = self.page.max(1);
        let limit = self.limit.clamp(1, MAX_LIMIT);
        Window {
            page,
            limit,
            offset: (page - 1) * limit,
        }
    }
}

/// Pagination metadata echoed back on list responses
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PageInfo {
    pub fn new(window: Window, total: i64) -> Self {
        Self {
            page: window.page,
            limit: window.limit,
            total,
            total_pages: (total + window.limit - 1) / window.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_clamps_page_and_limit() {
        let w = PageQuery { page: 0, limit: 500 }.window();
        assert_eq!(w.page, 1);
        assert_eq!(w.limit, MAX_LIMIT);
        assert_eq!(w.offset, 0);
    }

    #[test]
    fn window_computes_offset() {
        let w = PageQuery { page: 3, limit: 10 }.window();
        assert_eq!(w.offset, 20);
    }

    #[test]
    fn page_info_rounds_total_pages_up() {
        let w = PageQuery { page: 1, limit: 10 }.window();
        let info = PageInfo::new(w, 25);
        assert_eq!(info.total_pages, 3);

        let info = PageInfo::new(w, 0);
        assert_eq!(info.total_pages, 0);
    }
}
