//! Patient endpoints. Every read/update/delete folds the caller's site
//! scope into the store query; an out-of-scope id answers 404 exactly
//! like a missing one.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{
    filter_param, id_filter_param, ApiContext, AuthUser, PagedResponse,
};
use crate::db::repository::patient as patients;
use crate::models::{NewPatient, Pagination, PatientFilter, PatientPatch, PatientRow, Sort};

#[derive(Deserialize)]
pub struct PatientListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub site: Option<String>,
    pub building: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "sortField")]
    pub sort_field: Option<String>,
    #[serde(rename = "sortDirection")]
    pub sort_direction: Option<String>,
}

/// `POST /patients`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthUser>,
    Json(patient): Json<NewPatient>,
) -> Result<Json<PatientRow>, ApiError> {
    if patient.first_name.trim().is_empty() || patient.last_name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Patient first and last name are required".into(),
        ));
    }
    let conn = ctx.db.conn()?;
    Ok(Json(patients::insert_patient(&conn, &patient)?))
}

/// `GET /patients` — paginated, filtered, scope-constrained list.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<PagedResponse<PatientRow>>, ApiError> {
    let pagination = Pagination::new(query.page, query.limit);
    let is_active = match filter_param(query.status.as_deref()) {
        None => None,
        Some("active") => Some(true),
        Some("inactive") => Some(false),
        Some(other) => {
            return Err(ApiError::BadRequest(format!("Invalid status filter: {other}")))
        }
    };
    let filter = PatientFilter {
        search: query.search,
        site_id: id_filter_param(query.site.as_deref(), "site")?,
        building_id: id_filter_param(query.building.as_deref(), "building")?,
        is_active,
        sort: Sort {
            field: query.sort_field,
            direction: query.sort_direction,
        },
    };

    let conn = ctx.db.conn()?;
    let page = patients::list_patients(&conn, &filter, &pagination, &user.scope())?;
    Ok(Json(PagedResponse::new(page, &pagination)))
}

/// `GET /patients/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<PatientRow>, ApiError> {
    let conn = ctx.db.conn()?;
    patients::get_patient(&conn, id, &user.scope())?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))
}

/// `GET /patients/site/:site_id`
pub async fn by_site(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(site_id): Path<i64>,
) -> Result<Json<Vec<PatientRow>>, ApiError> {
    let conn = ctx.db.conn()?;
    Ok(Json(patients::patients_by_site(
        &conn,
        site_id,
        &user.scope(),
    )?))
}

/// `PUT /patients/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(patch): Json<PatientPatch>,
) -> Result<Json<PatientRow>, ApiError> {
    let conn = ctx.db.conn()?;
    patients::update_patient(&conn, id, &patch, &user.scope())?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
}

/// `DELETE /patients/:id` — cascades the patient's activities and
/// medical records.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let conn = ctx.db.conn()?;
    if !patients::delete_patient(&conn, id, &user.scope())? {
        return Err(ApiError::NotFound("Patient not found".into()));
    }
    Ok(Json(DeleteResponse {
        message: "Patient deleted successfully",
    }))
}
