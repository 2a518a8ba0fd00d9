//! Site endpoints. Reads are scope-filtered; mutations are admin-only.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthUser};
use crate::db::repository::site as sites;
use crate::models::{NewSite, Site, SitePatch, SiteWithBuildings};

/// `POST /sites` (admin)
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Json(site): Json<NewSite>,
) -> Result<Json<Site>, ApiError> {
    user.require_admin()?;
    if site.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Site name is required".into()));
    }
    let conn = ctx.db.conn()?;
    Ok(Json(sites::insert_site(&conn, &site)?))
}

/// `GET /sites` — sites in the caller's scope, sorted by name.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Site>>, ApiError> {
    let conn = ctx.db.conn()?;
    Ok(Json(sites::list_sites(&conn, &user.scope())?))
}

/// `GET /sites/with-buildings` — sites in scope, each with buildings.
pub async fn with_buildings(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<SiteWithBuildings>>, ApiError> {
    let conn = ctx.db.conn()?;
    Ok(Json(sites::sites_with_buildings(&conn, &user.scope())?))
}

/// `GET /sites/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Site>, ApiError> {
    let conn = ctx.db.conn()?;
    sites::get_site(&conn, id, &user.scope())?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Site not found".into()))
}

/// `PUT /sites/:id` (admin)
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(patch): Json<SitePatch>,
) -> Result<Json<Site>, ApiError> {
    user.require_admin()?;
    let conn = ctx.db.conn()?;
    sites::update_site(&conn, id, &patch)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Site not found".into()))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
}

/// `DELETE /sites/:id` (admin) — conflicts while users or patients
/// still reference the site; buildings cascade away with it.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    user.require_admin()?;
    let conn = ctx.db.conn()?;
    if !sites::delete_site(&conn, id)? {
        return Err(ApiError::NotFound("Site not found".into()));
    }
    Ok(Json(DeleteResponse {
        message: "Site deleted successfully",
    }))
}
