//! Medical-record store. Records hang off a patient; scope applies
//! transitively through the owning patient's site. "Latest" is creation
//! time descending.

use rusqlite::{params, params_from_iter, Connection, ToSql};

use super::patient::patient_site;
use crate::auth::AccessScope;
use crate::db::DatabaseError;
use crate::models::{MedicalRecord, MedicalRecordPatch, NewMedicalRecord};

const RECORD_COLS: &str = "id, patient_id, bp_at_goal, hospital_visit_since_last_review,
        a1c_at_goal, benzodiazepines, antipsychotics, opioids, fall_since_last_visit,
        created_at";

fn record_from_row(row: &rusqlite::Row) -> rusqlite::Result<MedicalRecord> {
    Ok(MedicalRecord {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        bp_at_goal: row.get::<_, i64>(2)? != 0,
        hospital_visit_since_last_review: row.get::<_, i64>(3)? != 0,
        a1c_at_goal: row.get::<_, i64>(4)? != 0,
        benzodiazepines: row.get::<_, i64>(5)? != 0,
        antipsychotics: row.get::<_, i64>(6)? != 0,
        opioids: row.get::<_, i64>(7)? != 0,
        fall_since_last_visit: row.get::<_, i64>(8)? != 0,
        created_at: row.get(9)?,
    })
}

/// Create a record. Returns `None` when the patient is absent or
/// outside the caller's scope.
pub fn insert_medical_record(
    conn: &Connection,
    record: &NewMedicalRecord,
    scope: &AccessScope,
) -> Result<Option<MedicalRecord>, DatabaseError> {
    match patient_site(conn, record.patient_id)? {
        Some(site_id) if scope.contains(site_id) => {}
        _ => return Ok(None),
    }

    conn.execute(
        "INSERT INTO medical_records (
            patient_id, bp_at_goal, hospital_visit_since_last_review, a1c_at_goal,
            benzodiazepines, antipsychotics, opioids, fall_since_last_visit
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            record.patient_id,
            record.bp_at_goal,
            record.hospital_visit_since_last_review,
            record.a1c_at_goal,
            record.benzodiazepines,
            record.antipsychotics,
            record.opioids,
            record.fall_since_last_visit,
        ],
    )?;
    let id = conn.last_insert_rowid();

    let mut stmt =
        conn.prepare(&format!("SELECT {RECORD_COLS} FROM medical_records WHERE id = ?1"))?;
    let record = stmt.query_row(params![id], record_from_row)?;
    Ok(Some(record))
}

pub fn get_record(
    conn: &Connection,
    id: i64,
    scope: &AccessScope,
) -> Result<Option<MedicalRecord>, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {RECORD_COLS} FROM medical_records WHERE id = ?1"))?;
    let record = match stmt.query_row(params![id], record_from_row) {
        Ok(record) => record,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    match patient_site(conn, record.patient_id)? {
        Some(site_id) if scope.contains(site_id) => Ok(Some(record)),
        _ => Ok(None),
    }
}

pub fn update_record(
    conn: &Connection,
    id: i64,
    patch: &MedicalRecordPatch,
    scope: &AccessScope,
) -> Result<Option<MedicalRecord>, DatabaseError> {
    if patch.is_empty() {
        return Err(DatabaseError::NothingToUpdate);
    }
    if get_record(conn, id, scope)?.is_none() {
        return Ok(None);
    }

    let mut sets: Vec<&str> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();
    let flags = [
        ("bp_at_goal = ?", patch.bp_at_goal),
        (
            "hospital_visit_since_last_review = ?",
            patch.hospital_visit_since_last_review,
        ),
        ("a1c_at_goal = ?", patch.a1c_at_goal),
        ("benzodiazepines = ?", patch.benzodiazepines),
        ("antipsychotics = ?", patch.antipsychotics),
        ("opioids = ?", patch.opioids),
        ("fall_since_last_visit = ?", patch.fall_since_last_visit),
    ];
    for (clause, value) in flags {
        if let Some(value) = value {
            sets.push(clause);
            values.push(Box::new(value));
        }
    }
    values.push(Box::new(id));

    conn.execute(
        &format!("UPDATE medical_records SET {} WHERE id = ?", sets.join(", ")),
        params_from_iter(values.iter().map(|v| v.as_ref())),
    )?;
    get_record(conn, id, &AccessScope::AllSites)
}

pub fn delete_record(
    conn: &Connection,
    id: i64,
    scope: &AccessScope,
) -> Result<bool, DatabaseError> {
    if get_record(conn, id, scope)?.is_none() {
        return Ok(false);
    }
    let deleted = conn.execute("DELETE FROM medical_records WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// All records for one patient, newest first. An out-of-scope patient
/// yields an empty list.
pub fn records_by_patient(
    conn: &Connection,
    patient_id: i64,
    scope: &AccessScope,
) -> Result<Vec<MedicalRecord>, DatabaseError> {
    match patient_site(conn, patient_id)? {
        Some(site_id) if scope.contains(site_id) => {}
        _ => return Ok(Vec::new()),
    }
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLS} FROM medical_records
         WHERE patient_id = ?1 ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map(params![patient_id], record_from_row)?;
    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

/// The most recent record for a patient, or `None` when there is none
/// (or the patient is outside scope — indistinguishable on purpose).
pub fn latest_record(
    conn: &Connection,
    patient_id: i64,
    scope: &AccessScope,
) -> Result<Option<MedicalRecord>, DatabaseError> {
    match patient_site(conn, patient_id)? {
        Some(site_id) if scope.contains(site_id) => {}
        _ => return Ok(None),
    }
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLS} FROM medical_records
         WHERE patient_id = ?1 ORDER BY created_at DESC, id DESC LIMIT 1"
    ))?;
    match stmt.query_row(params![patient_id], record_from_row) {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
