use crate::config::DEFAULT_PAGE_SIZE;

use super::Role;

/// A page of results plus the total row count before pagination.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}

/// page/limit → offset/limit. Page numbers are 1-based; a page past the
/// end simply yields an empty item set with the unchanged total.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        let limit = i64::from(self.limit);
        (total + limit - 1) / limit
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Requested sort: client-facing key plus direction. Keys are resolved
/// against a per-entity allow-list in the repository; unknown keys fall
/// back silently to the entity's default order.
#[derive(Debug, Clone, Default)]
pub struct Sort {
    pub field: Option<String>,
    pub direction: Option<String>,
}

impl Sort {
    /// "desc" (any case) → DESC, everything else → ASC.
    pub fn direction_sql(&self) -> &'static str {
        match &self.direction {
            Some(d) if d.eq_ignore_ascii_case("desc") => "DESC",
            _ => "ASC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PatientFilter {
    pub search: Option<String>,
    pub site_id: Option<i64>,
    pub building_id: Option<i64>,
    /// Business status: active/inactive. `None` means no filter.
    pub is_active: Option<bool>,
    pub sort: Sort,
}

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub search: Option<String>,
    pub activity_type: Option<String>,
    pub site_id: Option<i64>,
    pub pharm_flag: Option<bool>,
    pub sort: Sort,
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub search: Option<String>,
    pub role: Option<Role>,
    pub site_id: Option<i64>,
    pub sort: Sort,
}
