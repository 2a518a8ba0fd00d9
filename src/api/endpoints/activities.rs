//! Activity endpoints. Scope reaches activities through the owning
//! patient's site.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{
    bool_filter_param, filter_param, id_filter_param, ApiContext, AuthUser, PagedResponse,
};
use crate::db::repository::activity as activities;
use crate::models::{ActivityFilter, ActivityPatch, ActivityRow, NewActivity, Pagination, Sort};

#[derive(Deserialize)]
pub struct ActivityListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
    pub site: Option<String>,
    #[serde(rename = "pharmFlag")]
    pub pharm_flag: Option<String>,
    #[serde(rename = "sortField")]
    pub sort_field: Option<String>,
    #[serde(rename = "sortDirection")]
    pub sort_direction: Option<String>,
}

fn validate(activity_type: &str, duration_minutes: f64) -> Result<(), ApiError> {
    if activity_type.trim().is_empty() {
        return Err(ApiError::BadRequest("Activity type is required".into()));
    }
    if !duration_minutes.is_finite() || duration_minutes <= 0.0 {
        return Err(ApiError::BadRequest(
            "Duration must be a positive number of minutes".into(),
        ));
    }
    Ok(())
}

/// `POST /activities` — the owning patient must exist and be in scope.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Json(activity): Json<NewActivity>,
) -> Result<Json<ActivityRow>, ApiError> {
    validate(&activity.activity_type, activity.duration_minutes)?;

    let service_start = activity
        .service_start
        .unwrap_or_else(|| Utc::now().naive_utc());
    let conn = ctx.db.conn()?;
    activities::insert_activity(&conn, &activity, service_start, &user.scope())?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))
}

/// `GET /activities`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ActivityListQuery>,
) -> Result<Json<PagedResponse<ActivityRow>>, ApiError> {
    let pagination = Pagination::new(query.page, query.limit);
    let filter = ActivityFilter {
        search: query.search,
        activity_type: filter_param(query.activity_type.as_deref()).map(str::to_string),
        site_id: id_filter_param(query.site.as_deref(), "site")?,
        pharm_flag: bool_filter_param(query.pharm_flag.as_deref(), "pharmFlag")?,
        sort: Sort {
            field: query.sort_field,
            direction: query.sort_direction,
        },
    };

    let conn = ctx.db.conn()?;
    let page = activities::list_activities(&conn, &filter, &pagination, &user.scope())?;
    Ok(Json(PagedResponse::new(page, &pagination)))
}

/// `GET /activities/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<ActivityRow>, ApiError> {
    let conn = ctx.db.conn()?;
    activities::get_activity(&conn, id, &user.scope())?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Activity not found".into()))
}

/// `GET /activities/patient/:patient_id`
pub async fn by_patient(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Vec<ActivityRow>>, ApiError> {
    let conn = ctx.db.conn()?;
    Ok(Json(activities::activities_by_patient(
        &conn,
        patient_id,
        &user.scope(),
    )?))
}

/// `PUT /activities/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(patch): Json<ActivityPatch>,
) -> Result<Json<ActivityRow>, ApiError> {
    if let Some(duration) = patch.duration_minutes {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(ApiError::BadRequest(
                "Duration must be a positive number of minutes".into(),
            ));
        }
    }
    let conn = ctx.db.conn()?;
    activities::update_activity(&conn, id, &patch, &user.scope())?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Activity not found".into()))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
}

/// `DELETE /activities/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let conn = ctx.db.conn()?;
    if !activities::delete_activity(&conn, id, &user.scope())? {
        return Err(ApiError::NotFound("Activity not found".into()));
    }
    Ok(Json(DeleteResponse {
        message: "Activity deleted successfully",
    }))
}
