//! Medical-record endpoints. Access reaches records through the owning
//! patient's site.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthUser};
use crate::db::repository::medical_record as records;
use crate::models::{MedicalRecord, MedicalRecordPatch, NewMedicalRecord};

/// `POST /medical-records` — the patient must exist and be in scope.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Json(record): Json<NewMedicalRecord>,
) -> Result<Json<MedicalRecord>, ApiError> {
    let conn = ctx.db.conn()?;
    records::insert_medical_record(&conn, &record, &user.scope())?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))
}

/// `GET /medical-records/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<MedicalRecord>, ApiError> {
    let conn = ctx.db.conn()?;
    records::get_record(&conn, id, &user.scope())?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Medical record not found".into()))
}

/// `PUT /medical-records/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(patch): Json<MedicalRecordPatch>,
) -> Result<Json<MedicalRecord>, ApiError> {
    let conn = ctx.db.conn()?;
    records::update_record(&conn, id, &patch, &user.scope())?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Medical record not found".into()))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
}

/// `DELETE /medical-records/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let conn = ctx.db.conn()?;
    if !records::delete_record(&conn, id, &user.scope())? {
        return Err(ApiError::NotFound("Medical record not found".into()));
    }
    Ok(Json(DeleteResponse {
        message: "Medical record deleted successfully",
    }))
}

/// `GET /medical-records/patient/:patient_id` — newest first.
pub async fn by_patient(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Vec<MedicalRecord>>, ApiError> {
    let conn = ctx.db.conn()?;
    Ok(Json(records::records_by_patient(
        &conn,
        patient_id,
        &user.scope(),
    )?))
}

/// `GET /medical-records/patient/:patient_id/latest`
pub async fn latest(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(patient_id): Path<i64>,
) -> Result<Json<MedicalRecord>, ApiError> {
    let conn = ctx.db.conn()?;
    records::latest_record(&conn, patient_id, &user.scope())?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No medical records for this patient".into()))
}
