//! Patient store. A patient belongs to exactly one site; every scoped
//! read/update/delete folds `site_id ∈ scope` into the query, so an
//! out-of-scope id behaves exactly like a missing one.

use std::str::FromStr;

use rusqlite::{params, params_from_iter, Connection, ToSql};

use super::{like_pattern, order_clause, QueryParts};
use crate::auth::AccessScope;
use crate::db::{constraint_conflict, DatabaseError};
use crate::models::{
    Gender, NewPatient, Page, Pagination, Patient, PatientFilter, PatientPatch, PatientRow,
};

const SELECT: &str = "SELECT p.id, p.first_name, p.last_name, p.birthdate, p.gender,
        p.phone_number, p.contact_name, p.contact_phone_number, p.insurance,
        p.is_active, p.site_id, p.building_id, p.created_at,
        s.name AS site_name, b.name AS building_name";

const FROM: &str = "FROM patients p
        JOIN sites s ON s.id = p.site_id
        LEFT JOIN buildings b ON b.id = p.building_id";

const SORT_KEYS: &[(&str, &str)] = &[
    ("name", "p.first_name || ' ' || p.last_name"),
    ("birthdate", "p.birthdate"),
    ("site_name", "s.name"),
    ("status", "p.is_active"),
    ("created_at", "p.created_at"),
];

const DEFAULT_ORDER: &str = "p.created_at DESC, p.id DESC";

// Intermediate row shape — gender parses outside the rusqlite closure.
struct PatientRawRow {
    id: i64,
    first_name: String,
    last_name: String,
    birthdate: chrono::NaiveDate,
    gender: String,
    phone_number: Option<String>,
    contact_name: Option<String>,
    contact_phone_number: Option<String>,
    insurance: Option<String>,
    is_active: i64,
    site_id: i64,
    building_id: Option<i64>,
    created_at: chrono::NaiveDateTime,
    site_name: String,
    building_name: Option<String>,
}

fn raw_from_row(row: &rusqlite::Row) -> rusqlite::Result<PatientRawRow> {
    Ok(PatientRawRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        birthdate: row.get(3)?,
        gender: row.get(4)?,
        phone_number: row.get(5)?,
        contact_name: row.get(6)?,
        contact_phone_number: row.get(7)?,
        insurance: row.get(8)?,
        is_active: row.get(9)?,
        site_id: row.get(10)?,
        building_id: row.get(11)?,
        created_at: row.get(12)?,
        site_name: row.get(13)?,
        building_name: row.get(14)?,
    })
}

fn patient_from_raw(raw: PatientRawRow) -> Result<PatientRow, DatabaseError> {
    Ok(PatientRow {
        patient: Patient {
            id: raw.id,
            first_name: raw.first_name,
            last_name: raw.last_name,
            birthdate: raw.birthdate,
            gender: Gender::from_str(&raw.gender)?,
            phone_number: raw.phone_number,
            contact_name: raw.contact_name,
            contact_phone_number: raw.contact_phone_number,
            insurance: raw.insurance,
            is_active: raw.is_active != 0,
            site_id: raw.site_id,
            building_id: raw.building_id,
            created_at: raw.created_at,
        },
        site_name: raw.site_name,
        building_name: raw.building_name,
    })
}

pub fn insert_patient(
    conn: &Connection,
    patient: &NewPatient,
) -> Result<PatientRow, DatabaseError> {
    conn.execute(
        "INSERT INTO patients (
            first_name, last_name, birthdate, gender, phone_number,
            contact_name, contact_phone_number, insurance, is_active,
            site_id, building_id
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            patient.first_name,
            patient.last_name,
            patient.birthdate,
            patient.gender.as_str(),
            patient.phone_number,
            patient.contact_name,
            patient.contact_phone_number,
            patient.insurance,
            patient.is_active,
            patient.site_id,
            patient.building_id,
        ],
    )
    .map_err(|e| constraint_conflict(e, "Referenced site or building does not exist"))?;
    let id = conn.last_insert_rowid();
    get_patient(conn, id, &AccessScope::AllSites)?
        .ok_or(DatabaseError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
}

pub fn list_patients(
    conn: &Connection,
    filter: &PatientFilter,
    page: &Pagination,
    scope: &AccessScope,
) -> Result<Page<PatientRow>, DatabaseError> {
    if scope.is_empty() {
        return Ok(Page::empty());
    }

    let mut parts = QueryParts::new();
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        parts.bind_many(
            "(LOWER(p.first_name || ' ' || p.last_name) LIKE LOWER(?)
              OR LOWER(COALESCE(p.insurance, '')) LIKE LOWER(?)
              OR CAST(p.id AS TEXT) LIKE ?)",
            vec![
                Box::new(pattern.clone()),
                Box::new(pattern.clone()),
                Box::new(pattern),
            ],
        );
    }
    if let Some(site_id) = filter.site_id {
        parts.bind("p.site_id = ?", site_id);
    }
    if let Some(building_id) = filter.building_id {
        parts.bind("p.building_id = ?", building_id);
    }
    if let Some(is_active) = filter.is_active {
        parts.bind("p.is_active = ?", is_active);
    }
    if let Some(cond) = scope.sql_condition("p.site_id") {
        parts.condition(cond);
    }

    let where_clause = parts.where_clause();
    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) {FROM} {where_clause}"),
        params_from_iter(parts.params()),
        |row| row.get(0),
    )?;

    let order = order_clause(&filter.sort, SORT_KEYS, DEFAULT_ORDER);
    let mut stmt = conn.prepare(&format!(
        "{SELECT} {FROM} {where_clause} {order} LIMIT ? OFFSET ?"
    ))?;

    let limit = i64::from(page.limit);
    let offset = page.offset();
    let mut query_params: Vec<&dyn ToSql> = parts.params();
    query_params.push(&limit);
    query_params.push(&offset);

    let rows = stmt.query_map(params_from_iter(query_params), raw_from_row)?;
    let mut items = Vec::new();
    for row in rows {
        items.push(patient_from_raw(row?)?);
    }
    Ok(Page { items, total })
}

pub fn get_patient(
    conn: &Connection,
    id: i64,
    scope: &AccessScope,
) -> Result<Option<PatientRow>, DatabaseError> {
    let mut parts = QueryParts::new();
    parts.bind("p.id = ?", id);
    if let Some(cond) = scope.sql_condition("p.site_id") {
        parts.condition(cond);
    }
    let mut stmt = conn.prepare(&format!("{SELECT} {FROM} {}", parts.where_clause()))?;
    match stmt.query_row(params_from_iter(parts.params()), raw_from_row) {
        Ok(raw) => Ok(Some(patient_from_raw(raw)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Patients at one site, newest first. Out-of-scope sites yield an
/// empty list, indistinguishable from a site with no patients.
pub fn patients_by_site(
    conn: &Connection,
    site_id: i64,
    scope: &AccessScope,
) -> Result<Vec<PatientRow>, DatabaseError> {
    if !scope.contains(site_id) {
        return Ok(Vec::new());
    }
    let mut stmt = conn.prepare(&format!(
        "{SELECT} {FROM} WHERE p.site_id = ?1 ORDER BY {DEFAULT_ORDER}"
    ))?;
    let rows = stmt.query_map(params![site_id], raw_from_row)?;
    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_raw(row?)?);
    }
    Ok(patients)
}

pub fn update_patient(
    conn: &Connection,
    id: i64,
    patch: &PatientPatch,
    scope: &AccessScope,
) -> Result<Option<PatientRow>, DatabaseError> {
    if patch.is_empty() {
        return Err(DatabaseError::NothingToUpdate);
    }

    let mut sets: Vec<&str> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();
    if let Some(first_name) = &patch.first_name {
        sets.push("first_name = ?");
        values.push(Box::new(first_name.clone()));
    }
    if let Some(last_name) = &patch.last_name {
        sets.push("last_name = ?");
        values.push(Box::new(last_name.clone()));
    }
    if let Some(birthdate) = patch.birthdate {
        sets.push("birthdate = ?");
        values.push(Box::new(birthdate));
    }
    if let Some(gender) = patch.gender {
        sets.push("gender = ?");
        values.push(Box::new(gender.as_str()));
    }
    if let Some(phone_number) = &patch.phone_number {
        sets.push("phone_number = ?");
        values.push(Box::new(phone_number.clone()));
    }
    if let Some(contact_name) = &patch.contact_name {
        sets.push("contact_name = ?");
        values.push(Box::new(contact_name.clone()));
    }
    if let Some(contact_phone_number) = &patch.contact_phone_number {
        sets.push("contact_phone_number = ?");
        values.push(Box::new(contact_phone_number.clone()));
    }
    if let Some(insurance) = &patch.insurance {
        sets.push("insurance = ?");
        values.push(Box::new(insurance.clone()));
    }
    if let Some(is_active) = patch.is_active {
        sets.push("is_active = ?");
        values.push(Box::new(is_active));
    }
    if let Some(site_id) = patch.site_id {
        sets.push("site_id = ?");
        values.push(Box::new(site_id));
    }
    if let Some(building_id) = patch.building_id {
        sets.push("building_id = ?");
        values.push(Box::new(building_id));
    }
    values.push(Box::new(id));

    let scope_cond = match scope.sql_condition("site_id") {
        Some(cond) => format!(" AND {cond}"),
        None => String::new(),
    };
    let updated = conn
        .execute(
            &format!(
                "UPDATE patients SET {} WHERE id = ?{scope_cond}",
                sets.join(", ")
            ),
            params_from_iter(values.iter().map(|v| v.as_ref())),
        )
        .map_err(|e| constraint_conflict(e, "Referenced site or building does not exist"))?;
    if updated == 0 {
        return Ok(None);
    }
    get_patient(conn, id, &AccessScope::AllSites)
}

pub fn delete_patient(
    conn: &Connection,
    id: i64,
    scope: &AccessScope,
) -> Result<bool, DatabaseError> {
    let scope_cond = match scope.sql_condition("site_id") {
        Some(cond) => format!(" AND {cond}"),
        None => String::new(),
    };
    let deleted = conn.execute(
        &format!("DELETE FROM patients WHERE id = ?1{scope_cond}"),
        params![id],
    )?;
    Ok(deleted > 0)
}

/// The owning site of a patient, if the patient exists. Used to apply
/// scope transitively for activities and medical records.
pub(crate) fn patient_site(
    conn: &Connection,
    patient_id: i64,
) -> Result<Option<i64>, DatabaseError> {
    match conn.query_row(
        "SELECT site_id FROM patients WHERE id = ?1",
        params![patient_id],
        |row| row.get(0),
    ) {
        Ok(site_id) => Ok(Some(site_id)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
