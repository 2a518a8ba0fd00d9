//! Activity store. An activity's site is its owning patient's site —
//! scope is applied transitively through the patient join, and display
//! labels (patient name, user initials, site name) are derived at read
//! time.

use rusqlite::{params, params_from_iter, Connection, ToSql};

use super::patient::patient_site;
use super::{like_pattern, order_clause, QueryParts};
use crate::auth::AccessScope;
use crate::db::{constraint_conflict, DatabaseError};
use crate::models::{
    Activity, ActivityFilter, ActivityPatch, ActivityRow, NewActivity, Page, Pagination,
};

const SELECT: &str = "SELECT a.id, a.patient_id, a.user_id, a.activity_type, a.pharm_flag,
        a.notes, a.service_start, a.service_end, a.duration_minutes, a.created_at,
        p.first_name || ' ' || p.last_name AS patient_name,
        UPPER(SUBSTR(u.first_name, 1, 1)) || UPPER(SUBSTR(u.last_name, 1, 1)) AS user_initials,
        p.site_id, s.name AS site_name";

const FROM: &str = "FROM activities a
        JOIN patients p ON p.id = a.patient_id
        JOIN sites s ON s.id = p.site_id
        LEFT JOIN users u ON u.id = a.user_id";

const SORT_KEYS: &[(&str, &str)] = &[
    ("patient_name", "p.first_name || ' ' || p.last_name"),
    ("activity_type", "a.activity_type"),
    ("site_name", "s.name"),
    ("pharm_flag", "a.pharm_flag"),
    ("service_start", "a.service_start"),
    ("duration_minutes", "a.duration_minutes"),
    ("created_at", "a.created_at"),
];

const DEFAULT_ORDER: &str = "a.created_at DESC, a.id DESC";

fn row_from_row(row: &rusqlite::Row) -> rusqlite::Result<ActivityRow> {
    Ok(ActivityRow {
        activity: Activity {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            user_id: row.get(2)?,
            activity_type: row.get(3)?,
            pharm_flag: row.get::<_, i64>(4)? != 0,
            notes: row.get(5)?,
            service_start: row.get(6)?,
            service_end: row.get(7)?,
            duration_minutes: row.get(8)?,
            created_at: row.get(9)?,
        },
        patient_name: row.get(10)?,
        user_initials: row.get(11)?,
        site_id: row.get(12)?,
        site_name: row.get(13)?,
    })
}

/// Scope condition applied through the owning patient. Used on UPDATE
/// and DELETE where the patient join is not available directly.
fn scope_exists_condition(scope: &AccessScope) -> Option<String> {
    scope.sql_condition("p.site_id").map(|cond| {
        format!(
            "EXISTS (SELECT 1 FROM patients p WHERE p.id = activities.patient_id AND {cond})"
        )
    })
}

/// Create an activity. Returns `None` when the owning patient is absent
/// or outside the caller's scope — indistinguishable on purpose.
pub fn insert_activity(
    conn: &Connection,
    activity: &NewActivity,
    service_start: chrono::NaiveDateTime,
    scope: &AccessScope,
) -> Result<Option<ActivityRow>, DatabaseError> {
    match patient_site(conn, activity.patient_id)? {
        Some(site_id) if scope.contains(site_id) => {}
        _ => return Ok(None),
    }

    conn.execute(
        "INSERT INTO activities (
            patient_id, user_id, activity_type, pharm_flag, notes,
            service_start, service_end, duration_minutes
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            activity.patient_id,
            activity.user_id,
            activity.activity_type,
            activity.pharm_flag,
            activity.notes,
            service_start,
            activity.service_end,
            activity.duration_minutes,
        ],
    )
    .map_err(|e| constraint_conflict(e, "Referenced patient or user does not exist"))?;
    let id = conn.last_insert_rowid();
    get_activity(conn, id, &AccessScope::AllSites)
}

pub fn list_activities(
    conn: &Connection,
    filter: &ActivityFilter,
    page: &Pagination,
    scope: &AccessScope,
) -> Result<Page<ActivityRow>, DatabaseError> {
    if scope.is_empty() {
        return Ok(Page::empty());
    }

    let mut parts = QueryParts::new();
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        parts.bind_many(
            "(LOWER(p.first_name || ' ' || p.last_name) LIKE LOWER(?)
              OR LOWER(a.activity_type) LIKE LOWER(?)
              OR LOWER(a.notes) LIKE LOWER(?)
              OR CAST(a.id AS TEXT) LIKE ?)",
            vec![
                Box::new(pattern.clone()),
                Box::new(pattern.clone()),
                Box::new(pattern.clone()),
                Box::new(pattern),
            ],
        );
    }
    if let Some(activity_type) = filter
        .activity_type
        .as_deref()
        .filter(|t| !t.trim().is_empty())
    {
        parts.bind("a.activity_type = ?", activity_type.to_string());
    }
    if let Some(site_id) = filter.site_id {
        parts.bind("p.site_id = ?", site_id);
    }
    if let Some(pharm_flag) = filter.pharm_flag {
        parts.bind("a.pharm_flag = ?", pharm_flag);
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

    let rows = stmt.query_map(params_from_iter(query_params), row_from_row)?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(Page { items, total })
}

pub fn get_activity(
    conn: &Connection,
    id: i64,
    scope: &AccessScope,
) -> Result<Option<ActivityRow>, DatabaseError> {
    let mut parts = QueryParts::new();
    parts.bind("a.id = ?", id);
    if let Some(cond) = scope.sql_condition("p.site_id") {
        parts.condition(cond);
    }
    let mut stmt = conn.prepare(&format!("{SELECT} {FROM} {}", parts.where_clause()))?;
    match stmt.query_row(params_from_iter(parts.params()), row_from_row) {
        Ok(row) => Ok(Some(row)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All activities for one patient, newest first. An out-of-scope
/// patient yields an empty list.
pub fn activities_by_patient(
    conn: &Connection,
    patient_id: i64,
    scope: &AccessScope,
) -> Result<Vec<ActivityRow>, DatabaseError> {
    match patient_site(conn, patient_id)? {
        Some(site_id) if scope.contains(site_id) => {}
        _ => return Ok(Vec::new()),
    }
    let mut stmt = conn.prepare(&format!(
        "{SELECT} {FROM} WHERE a.patient_id = ?1 ORDER BY {DEFAULT_ORDER}"
    ))?;
    let rows = stmt.query_map(params![patient_id], row_from_row)?;
    let mut activities = Vec::new();
    for row in rows {
        activities.push(row?);
    }
    Ok(activities)
}

pub fn update_activity(
    conn: &Connection,
    id: i64,
    patch: &ActivityPatch,
    scope: &AccessScope,
) -> Result<Option<ActivityRow>, DatabaseError> {
    if patch.is_empty() {
        return Err(DatabaseError::NothingToUpdate);
    }

    // Re-parenting onto another patient requires that patient to be in
    // scope as well.
    if let Some(new_patient_id) = patch.patient_id {
        match patient_site(conn, new_patient_id)? {
            Some(site_id) if scope.contains(site_id) => {}
            _ => return Ok(None),
        }
    }

    let mut sets: Vec<&str> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();
    if let Some(patient_id) = patch.patient_id {
        sets.push("patient_id = ?");
        values.push(Box::new(patient_id));
    }
    if let Some(user_id) = patch.user_id {
        sets.push("user_id = ?");
        values.push(Box::new(user_id));
    }
    if let Some(activity_type) = &patch.activity_type {
        sets.push("activity_type = ?");
        values.push(Box::new(activity_type.clone()));
    }
    if let Some(pharm_flag) = patch.pharm_flag {
        sets.push("pharm_flag = ?");
        values.push(Box::new(pharm_flag));
    }
    if let Some(notes) = &patch.notes {
        sets.push("notes = ?");
        values.push(Box::new(notes.clone()));
    }
    if let Some(service_start) = patch.service_start {
        sets.push("service_start = ?");
        values.push(Box::new(service_start));
    }
    if let Some(service_end) = patch.service_end {
        sets.push("service_end = ?");
        values.push(Box::new(service_end));
    }
    if let Some(duration_minutes) = patch.duration_minutes {
        sets.push("duration_minutes = ?");
        values.push(Box::new(duration_minutes));
    }
    values.push(Box::new(id));

    let scope_cond = match scope_exists_condition(scope) {
        Some(cond) => format!(" AND {cond}"),
        None => String::new(),
    };
    let updated = conn
        .execute(
            &format!(
                "UPDATE activities SET {} WHERE id = ?{scope_cond}",
                sets.join(", ")
            ),
            params_from_iter(values.iter().map(|v| v.as_ref())),
        )
        .map_err(|e| constraint_conflict(e, "Referenced patient or user does not exist"))?;
    if updated == 0 {
        return Ok(None);
    }
    get_activity(conn, id, &AccessScope::AllSites)
}

pub fn delete_activity(
    conn: &Connection,
    id: i64,
    scope: &AccessScope,
) -> Result<bool, DatabaseError> {
    let scope_cond = match scope_exists_condition(scope) {
        Some(cond) => format!(" AND {cond}"),
        None => String::new(),
    };
    let deleted = conn.execute(
        &format!("DELETE FROM activities WHERE id = ?1{scope_cond}"),
        params![id],
    )?;
    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::patient::insert_patient;
    use crate::db::repository::site::insert_site;
    use crate::db::repository::user::insert_user;
    use crate::models::{Gender, NewPatient, NewSite, NewUser, Role, Sort};

    fn seed_site(conn: &Connection, name: &str) -> i64 {
        insert_site(
            conn,
            &NewSite {
                name: name.into(),
                address: None,
                city: None,
                state: None,
                zip: None,
                is_active: true,
            },
        )
        .unwrap()
        .id
    }

    fn seed_patient(conn: &Connection, first: &str, last: &str, site_id: i64) -> i64 {
        insert_patient(
            conn,
            &NewPatient {
                first_name: first.into(),
                last_name: last.into(),
                birthdate: "1950-01-01".parse().unwrap(),
                gender: Gender::Male,
                phone_number: None,
                contact_name: None,
                contact_phone_number: None,
                insurance: None,
                is_active: true,
                site_id,
                building_id: None,
            },
        )
        .unwrap()
        .patient
        .id
    }

    fn seed_user(conn: &Connection, first: &str, last: &str, email: &str, site_id: i64) -> i64 {
        insert_user(
            conn,
            &NewUser {
                first_name: first.into(),
                last_name: last.into(),
                email: email.into(),
                password: String::new(),
                role: Role::Nurse,
                primary_site_id: site_id,
                assigned_site_ids: vec![],
            },
            "unused-hash",
        )
        .unwrap()
        .id
    }

    fn new_activity(patient_id: i64, user_id: Option<i64>, minutes: f64) -> NewActivity {
        NewActivity {
            patient_id,
            user_id,
            activity_type: "med review".into(),
            pharm_flag: false,
            notes: "routine check".into(),
            service_start: None,
            service_end: None,
            duration_minutes: minutes,
        }
    }

    fn start() -> chrono::NaiveDateTime {
        "2026-01-05T10:00:00".parse().unwrap()
    }

    #[test]
    fn fractional_minutes_round_trip_exactly() {
        let conn = open_memory_database().unwrap();
        let site = seed_site(&conn, "A");
        let patient = seed_patient(&conn, "Maria", "Lopez", site);

        let row = insert_activity(
            &conn,
            &new_activity(patient, None, 1.5),
            start(),
            &AccessScope::AllSites,
        )
        .unwrap()
        .unwrap();
        assert_eq!(row.activity.duration_minutes, 1.5);

        let fetched = get_activity(&conn, row.activity.id, &AccessScope::AllSites)
            .unwrap()
            .unwrap();
        assert_eq!(fetched.activity.duration_minutes, 1.5);
    }

    #[test]
    fn enrichment_joins_labels_at_read_time() {
        let conn = open_memory_database().unwrap();
        let site = seed_site(&conn, "North Clinic");
        let patient = seed_patient(&conn, "Maria", "Lopez", site);
        let user = seed_user(&conn, "Dana", "Reyes", "dana@example.com", site);

        let row = insert_activity(
            &conn,
            &new_activity(patient, Some(user), 30.0),
            start(),
            &AccessScope::AllSites,
        )
        .unwrap()
        .unwrap();

        assert_eq!(row.patient_name, "Maria Lopez");
        assert_eq!(row.user_initials.as_deref(), Some("DR"));
        assert_eq!(row.site_id, site);
        assert_eq!(row.site_name, "North Clinic");
    }

    #[test]
    fn create_for_out_of_scope_patient_is_none() {
        let conn = open_memory_database().unwrap();
        let site1 = seed_site(&conn, "Site 1");
        let site2 = seed_site(&conn, "Site 2");
        let patient = seed_patient(&conn, "Maria", "Lopez", site2);

        let scope = AccessScope::for_user(Role::Nurse, site1, &[]);
        let created =
            insert_activity(&conn, &new_activity(patient, None, 10.0), start(), &scope).unwrap();
        assert!(created.is_none());

        // And for a nonexistent patient, the same
        let created =
            insert_activity(&conn, &new_activity(9999, None, 10.0), start(), &scope).unwrap();
        assert!(created.is_none());
    }

    #[test]
    fn list_scopes_transitively_through_patient() {
        let conn = open_memory_database().unwrap();
        let site1 = seed_site(&conn, "Site 1");
        let site2 = seed_site(&conn, "Site 2");
        let visible = seed_patient(&conn, "In", "Scope", site1);
        let hidden = seed_patient(&conn, "Out", "Scope", site2);
        insert_activity(
            &conn,
            &new_activity(visible, None, 5.0),
            start(),
            &AccessScope::AllSites,
        )
        .unwrap();
        insert_activity(
            &conn,
            &new_activity(hidden, None, 5.0),
            start(),
            &AccessScope::AllSites,
        )
        .unwrap();

        let scope = AccessScope::for_user(Role::Pharmacist, site1, &[]);
        let page = list_activities(
            &conn,
            &ActivityFilter::default(),
            &Pagination::default(),
            &scope,
        )
        .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].activity.patient_id, visible);
    }

    #[test]
    fn search_matches_type_notes_and_patient_name() {
        let conn = open_memory_database().unwrap();
        let site = seed_site(&conn, "A");
        let maria = seed_patient(&conn, "Maria", "Lopez", site);
        let john = seed_patient(&conn, "John", "Smith", site);
        insert_activity(
            &conn,
            &new_activity(maria, None, 5.0),
            start(),
            &AccessScope::AllSites,
        )
        .unwrap();
        let mut walk = new_activity(john, None, 5.0);
        walk.activity_type = "walking assist".into();
        walk.notes = "needed wheelchair".into();
        insert_activity(&conn, &walk, start(), &AccessScope::AllSites).unwrap();

        for (query, expected_total) in
            [("LOPEZ", 1), ("walking", 1), ("wheelchair", 1), ("xyz", 0)]
        {
            let filter = ActivityFilter {
                search: Some(query.into()),
                ..Default::default()
            };
            let page = list_activities(
                &conn,
                &filter,
                &Pagination::default(),
                &AccessScope::AllSites,
            )
            .unwrap();
            assert_eq!(page.total, expected_total, "query {query:?}");
        }
    }

    #[test]
    fn pharm_flag_filter() {
        let conn = open_memory_database().unwrap();
        let site = seed_site(&conn, "A");
        let patient = seed_patient(&conn, "Maria", "Lopez", site);
        let mut flagged = new_activity(patient, None, 5.0);
        flagged.pharm_flag = true;
        insert_activity(&conn, &flagged, start(), &AccessScope::AllSites).unwrap();
        insert_activity(
            &conn,
            &new_activity(patient, None, 5.0),
            start(),
            &AccessScope::AllSites,
        )
        .unwrap();

        let filter = ActivityFilter {
            pharm_flag: Some(true),
            ..Default::default()
        };
        let page = list_activities(
            &conn,
            &filter,
            &Pagination::default(),
            &AccessScope::AllSites,
        )
        .unwrap();
        assert_eq!(page.total, 1);
        assert!(page.items[0].activity.pharm_flag);
    }

    #[test]
    fn sort_by_duration_descending() {
        let conn = open_memory_database().unwrap();
        let site = seed_site(&conn, "A");
        let patient = seed_patient(&conn, "Maria", "Lopez", site);
        for minutes in [5.0, 45.0, 12.5] {
            insert_activity(
                &conn,
                &new_activity(patient, None, minutes),
                start(),
                &AccessScope::AllSites,
            )
            .unwrap();
        }

        let filter = ActivityFilter {
            sort: Sort {
                field: Some("duration_minutes".into()),
                direction: Some("desc".into()),
            },
            ..Default::default()
        };
        let page = list_activities(
            &conn,
            &filter,
            &Pagination::default(),
            &AccessScope::AllSites,
        )
        .unwrap();
        let durations: Vec<f64> = page
            .items
            .iter()
            .map(|a| a.activity.duration_minutes)
            .collect();
        assert_eq!(durations, vec![45.0, 12.5, 5.0]);
    }

    #[test]
    fn update_outside_scope_is_none() {
        let conn = open_memory_database().unwrap();
        let site1 = seed_site(&conn, "Site 1");
        let site2 = seed_site(&conn, "Site 2");
        let patient = seed_patient(&conn, "Maria", "Lopez", site2);
        let row = insert_activity(
            &conn,
            &new_activity(patient, None, 5.0),
            start(),
            &AccessScope::AllSites,
        )
        .unwrap()
        .unwrap();

        let scope = AccessScope::for_user(Role::Nurse, site1, &[]);
        let patch = ActivityPatch {
            notes: Some("edited".into()),
            ..Default::default()
        };
        assert!(update_activity(&conn, row.activity.id, &patch, &scope)
            .unwrap()
            .is_none());
    }

    #[test]
    fn reparenting_to_out_of_scope_patient_is_none() {
        let conn = open_memory_database().unwrap();
        let site1 = seed_site(&conn, "Site 1");
        let site2 = seed_site(&conn, "Site 2");
        let mine = seed_patient(&conn, "In", "Scope", site1);
        let other = seed_patient(&conn, "Out", "Scope", site2);
        let row = insert_activity(
            &conn,
            &new_activity(mine, None, 5.0),
            start(),
            &AccessScope::AllSites,
        )
        .unwrap()
        .unwrap();

        let scope = AccessScope::for_user(Role::Nurse, site1, &[]);
        let patch = ActivityPatch {
            patient_id: Some(other),
            ..Default::default()
        };
        assert!(update_activity(&conn, row.activity.id, &patch, &scope)
            .unwrap()
            .is_none());
    }

    #[test]
    fn empty_patch_is_rejected() {
        let conn = open_memory_database().unwrap();
        let site = seed_site(&conn, "A");
        let patient = seed_patient(&conn, "Maria", "Lopez", site);
        let row = insert_activity(
            &conn,
            &new_activity(patient, None, 5.0),
            start(),
            &AccessScope::AllSites,
        )
        .unwrap()
        .unwrap();

        let err = update_activity(
            &conn,
            row.activity.id,
            &ActivityPatch::default(),
            &AccessScope::AllSites,
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::NothingToUpdate));
    }

    #[test]
    fn by_patient_outside_scope_is_empty() {
        let conn = open_memory_database().unwrap();
        let site1 = seed_site(&conn, "Site 1");
        let site2 = seed_site(&conn, "Site 2");
        let patient = seed_patient(&conn, "Maria", "Lopez", site2);
        insert_activity(
            &conn,
            &new_activity(patient, None, 5.0),
            start(),
            &AccessScope::AllSites,
        )
        .unwrap();

        let scope = AccessScope::for_user(Role::Nurse, site1, &[]);
        assert!(activities_by_patient(&conn, patient, &scope)
            .unwrap()
            .is_empty());
        assert_eq!(
            activities_by_patient(&conn, patient, &AccessScope::AllSites)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn delete_respects_scope() {
        let conn = open_memory_database().unwrap();
        let site1 = seed_site(&conn, "Site 1");
        let site2 = seed_site(&conn, "Site 2");
        let patient = seed_patient(&conn, "Maria", "Lopez", site2);
        let row = insert_activity(
            &conn,
            &new_activity(patient, None, 5.0),
            start(),
            &AccessScope::AllSites,
        )
        .unwrap()
        .unwrap();

        let scope = AccessScope::for_user(Role::Nurse, site1, &[]);
        assert!(!delete_activity(&conn, row.activity.id, &scope).unwrap());
        assert!(delete_activity(&conn, row.activity.id, &AccessScope::AllSites).unwrap());
    }
}
