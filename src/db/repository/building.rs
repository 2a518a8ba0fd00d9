//! Building store. Buildings live inside a site; scope applies through
//! their `site_id`.

use rusqlite::{params, params_from_iter, Connection, ToSql};

use super::QueryParts;
use crate::auth::AccessScope;
use crate::db::{constraint_conflict, DatabaseError};
use crate::models::{Building, BuildingPatch, NewBuilding};

const BUILDING_COLS: &str = "id, name, site_id, is_active, created_at";

fn building_from_row(row: &rusqlite::Row) -> rusqlite::Result<Building> {
    Ok(Building {
        id: row.get(0)?,
        name: row.get(1)?,
        site_id: row.get(2)?,
        is_active: row.get::<_, i64>(3)? != 0,
        created_at: row.get(4)?,
    })
}

pub fn insert_building(
    conn: &Connection,
    building: &NewBuilding,
) -> Result<Building, DatabaseError> {
    conn.execute(
        "INSERT INTO buildings (name, site_id, is_active) VALUES (?1, ?2, ?3)",
        params![building.name, building.site_id, building.is_active],
    )
    .map_err(|e| constraint_conflict(e, "Referenced site does not exist"))?;
    let id = conn.last_insert_rowid();
    get_building(conn, id, &AccessScope::AllSites)?
        .ok_or(DatabaseError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
}

pub fn list_buildings(
    conn: &Connection,
    scope: &AccessScope,
) -> Result<Vec<Building>, DatabaseError> {
    if scope.is_empty() {
        return Ok(Vec::new());
    }
    let mut parts = QueryParts::new();
    if let Some(cond) = scope.sql_condition("site_id") {
        parts.condition(cond);
    }
    query_buildings(conn, &parts)
}

pub fn buildings_by_site(
    conn: &Connection,
    site_id: i64,
    scope: &AccessScope,
) -> Result<Vec<Building>, DatabaseError> {
    if !scope.contains(site_id) {
        return Ok(Vec::new());
    }
    let mut parts = QueryParts::new();
    parts.bind("site_id = ?", site_id);
    query_buildings(conn, &parts)
}

fn query_buildings(
    conn: &Connection,
    parts: &QueryParts,
) -> Result<Vec<Building>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BUILDING_COLS} FROM buildings {} ORDER BY name ASC",
        parts.where_clause()
    ))?;
    let rows = stmt.query_map(params_from_iter(parts.params()), building_from_row)?;

    let mut buildings = Vec::new();
    for row in rows {
        buildings.push(row?);
    }
    Ok(buildings)
}

pub fn get_building(
    conn: &Connection,
    id: i64,
    scope: &AccessScope,
) -> Result<Option<Building>, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {BUILDING_COLS} FROM buildings WHERE id = ?1"))?;
    match stmt.query_row(params![id], building_from_row) {
        Ok(building) if scope.contains(building.site_id) => Ok(Some(building)),
        Ok(_) => Ok(None),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_building(
    conn: &Connection,
    id: i64,
    patch: &BuildingPatch,
) -> Result<Option<Building>, DatabaseError> {
    if patch.is_empty() {
        return Err(DatabaseError::NothingToUpdate);
    }

    let mut sets: Vec<&str> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();
    if let Some(name) = &patch.name {
        sets.push("name = ?");
        values.push(Box::new(name.clone()));
    }
    if let Some(site_id) = patch.site_id {
        sets.push("site_id = ?");
        values.push(Box::new(site_id));
    }
    if let Some(is_active) = patch.is_active {
        sets.push("is_active = ?");
        values.push(Box::new(is_active));
    }
    values.push(Box::new(id));

    let updated = conn
        .execute(
            &format!("UPDATE buildings SET {} WHERE id = ?", sets.join(", ")),
            params_from_iter(values.iter().map(|v| v.as_ref())),
        )
        .map_err(|e| constraint_conflict(e, "Referenced site does not exist"))?;
    if updated == 0 {
        return Ok(None);
    }
    get_building(conn, id, &AccessScope::AllSites)
}

pub fn delete_building(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let deleted = conn.execute("DELETE FROM buildings WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::site::insert_site;
    use crate::models::{NewSite, Role};

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

    fn new_building(name: &str, site_id: i64) -> NewBuilding {
        NewBuilding {
            name: name.into(),
            site_id,
            is_active: true,
        }
    }

    #[test]
    fn site_building_scenario() {
        // Admin creates Site "North Clinic", then Building "Wing A" in it:
        // the building list for that site returns exactly that one entry.
        let conn = open_memory_database().unwrap();
        let north = seed_site(&conn, "North Clinic");
        insert_building(&conn, &new_building("Wing A", north)).unwrap();

        let buildings = buildings_by_site(&conn, north, &AccessScope::AllSites).unwrap();
        assert_eq!(buildings.len(), 1);
        assert_eq!(buildings[0].name, "Wing A");
        assert_eq!(buildings[0].site_id, north);
    }

    #[test]
    fn insert_for_missing_site_conflicts() {
        let conn = open_memory_database().unwrap();
        let err = insert_building(&conn, &new_building("Wing A", 404)).unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[test]
    fn list_filters_by_scope() {
        let conn = open_memory_database().unwrap();
        let a = seed_site(&conn, "A");
        let b = seed_site(&conn, "B");
        insert_building(&conn, &new_building("In scope", a)).unwrap();
        insert_building(&conn, &new_building("Out of scope", b)).unwrap();

        let scope = AccessScope::for_user(Role::Nurse, a, &[]);
        let buildings = list_buildings(&conn, &scope).unwrap();
        assert_eq!(buildings.len(), 1);
        assert_eq!(buildings[0].name, "In scope");
    }

    #[test]
    fn by_site_outside_scope_is_empty() {
        let conn = open_memory_database().unwrap();
        let a = seed_site(&conn, "A");
        let b = seed_site(&conn, "B");
        insert_building(&conn, &new_building("Hidden", b)).unwrap();

        let scope = AccessScope::for_user(Role::Nurse, a, &[]);
        assert!(buildings_by_site(&conn, b, &scope).unwrap().is_empty());
    }

    #[test]
    fn get_outside_scope_is_none() {
        let conn = open_memory_database().unwrap();
        let a = seed_site(&conn, "A");
        let b = seed_site(&conn, "B");
        let hidden = insert_building(&conn, &new_building("Hidden", b)).unwrap();

        let scope = AccessScope::for_user(Role::Nurse, a, &[]);
        assert!(get_building(&conn, hidden.id, &scope).unwrap().is_none());
    }

    #[test]
    fn patch_moves_building_between_sites() {
        let conn = open_memory_database().unwrap();
        let a = seed_site(&conn, "A");
        let b = seed_site(&conn, "B");
        let building = insert_building(&conn, &new_building("Wing", a)).unwrap();

        let patch = BuildingPatch {
            site_id: Some(b),
            ..Default::default()
        };
        let updated = update_building(&conn, building.id, &patch).unwrap().unwrap();
        assert_eq!(updated.site_id, b);
        assert_eq!(updated.name, "Wing");
    }

    #[test]
    fn empty_patch_is_rejected() {
        let conn = open_memory_database().unwrap();
        let a = seed_site(&conn, "A");
        let building = insert_building(&conn, &new_building("Wing", a)).unwrap();
        let err = update_building(&conn, building.id, &BuildingPatch::default()).unwrap_err();
        assert!(matches!(err, DatabaseError::NothingToUpdate));
    }
}
