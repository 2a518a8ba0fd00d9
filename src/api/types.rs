//! Shared types for the API layer.

use std::sync::Arc;

use serde::Serialize;

use crate::auth::{AccessScope, Claims};
use crate::config::AppConfig;
use crate::db::Db;
use crate::models::{Page, Pagination};

use super::error::ApiError;

// ═══════════════════════════════════════════════════════════
// API context — shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all routes and middleware: the injected
/// data-access handle plus startup configuration.
#[derive(Clone)]
pub struct ApiContext {
    pub db: Db,
    pub config: Arc<AppConfig>,
}

impl ApiContext {
    pub fn new(db: Db, config: AppConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Authenticated user — injected by the auth middleware
// ═══════════════════════════════════════════════════════════

/// Verified identity for the current request, injected into request
/// extensions after token verification. Wraps the token claims, which
/// are the sole basis for authorization decisions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: Claims,
}

impl AuthUser {
    pub fn user_id(&self) -> i64 {
        self.claims.sub
    }

    pub fn is_admin(&self) -> bool {
        self.claims.role.is_admin()
    }

    /// The site scope this user may act upon.
    pub fn scope(&self) -> AccessScope {
        self.claims.scope()
    }

    /// Role gate for admin-only operations. This is the one place a 403
    /// is produced — scope denials surface as not-found instead.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Paginated response envelope
// ═══════════════════════════════════════════════════════════

/// Wire shape for paginated lists:
/// `{ items, total, page, limit, totalPages }`.
#[derive(Debug, Serialize)]
pub struct PagedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

impl<T> PagedResponse<T> {
    pub fn new(page: Page<T>, pagination: &Pagination) -> Self {
        Self {
            total_pages: pagination.total_pages(page.total),
            items: page.items,
            total: page.total,
            page: pagination.page,
            limit: pagination.limit,
        }
    }
}

/// Parse an optional structured-filter value with the sentinel `"all"`
/// (or empty) meaning "no filter".
pub fn filter_param(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

/// Parse an id-valued filter param; non-numeric values are a client
/// error rather than silently ignored.
pub fn id_filter_param(value: Option<&str>, name: &str) -> Result<Option<i64>, ApiError> {
    match filter_param(value) {
        None => Ok(None),
        Some(v) => v
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("Invalid {name} filter: {v}"))),
    }
}

/// Parse a boolean filter param ("true"/"false", sentinel "all").
pub fn bool_filter_param(value: Option<&str>, name: &str) -> Result<Option<bool>, ApiError> {
    match filter_param(value) {
        None => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(v) => Err(ApiError::BadRequest(format!("Invalid {name} filter: {v}"))),
    }
}
