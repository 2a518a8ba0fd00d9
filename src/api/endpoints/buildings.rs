//! Building endpoints. Scope applies through the owning site.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthUser};
use crate::db::repository::building as buildings;
use crate::models::{Building, BuildingPatch, NewBuilding};

/// `POST /buildings` (admin)
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Json(building): Json<NewBuilding>,
) -> Result<Json<Building>, ApiError> {
    user.require_admin()?;
    if building.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Building name is required".into()));
    }
    let conn = ctx.db.conn()?;
    Ok(Json(buildings::insert_building(&conn, &building)?))
}

/// `GET /buildings` — buildings whose site is in scope.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Building>>, ApiError> {
    let conn = ctx.db.conn()?;
    Ok(Json(buildings::list_buildings(&conn, &user.scope())?))
}

/// `GET /buildings/site/:site_id`
pub async fn by_site(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(site_id): Path<i64>,
) -> Result<Json<Vec<Building>>, ApiError> {
    let conn = ctx.db.conn()?;
    Ok(Json(buildings::buildings_by_site(
        &conn,
        site_id,
        &user.scope(),
    )?))
}

/// `GET /buildings/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Building>, ApiError> {
    let conn = ctx.db.conn()?;
    buildings::get_building(&conn, id, &user.scope())?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Building not found".into()))
}

/// `PUT /buildings/:id` (admin)
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(patch): Json<BuildingPatch>,
) -> Result<Json<Building>, ApiError> {
    user.require_admin()?;
    let conn = ctx.db.conn()?;
    buildings::update_building(&conn, id, &patch)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Building not found".into()))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
}

/// `DELETE /buildings/:id` (admin)
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    user.require_admin()?;
    let conn = ctx.db.conn()?;
    if !buildings::delete_building(&conn, id)? {
        return Err(ApiError::NotFound("Building not found".into()));
    }
    Ok(Json(DeleteResponse {
        message: "Building deleted successfully",
    }))
}
