//! Site store. Sites are the root of the access scope; non-admin users
//! only see sites in their own scope.

use rusqlite::{params, params_from_iter, Connection, ToSql};

use super::building;
use crate::auth::AccessScope;
use crate::db::{constraint_conflict, DatabaseError};
use crate::models::{NewSite, Site, SitePatch, SiteWithBuildings};

const SITE_COLS: &str = "id, name, address, city, state, zip, is_active, created_at";

fn site_from_row(row: &rusqlite::Row) -> rusqlite::Result<Site> {
    Ok(Site {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        city: row.get(3)?,
        state: row.get(4)?,
        zip: row.get(5)?,
        is_active: row.get::<_, i64>(6)? != 0,
        created_at: row.get(7)?,
    })
}

pub fn insert_site(conn: &Connection, site: &NewSite) -> Result<Site, DatabaseError> {
    conn.execute(
        "INSERT INTO sites (name, address, city, state, zip, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            site.name,
            site.address,
            site.city,
            site.state,
            site.zip,
            site.is_active,
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_site(conn, id, &AccessScope::AllSites)?
        .ok_or(DatabaseError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
}

pub fn list_sites(conn: &Connection, scope: &AccessScope) -> Result<Vec<Site>, DatabaseError> {
    if scope.is_empty() {
        return Ok(Vec::new());
    }
    let where_clause = match scope.sql_condition("id") {
        Some(cond) => format!("WHERE {cond}"),
        None => String::new(),
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {SITE_COLS} FROM sites {where_clause} ORDER BY name"
    ))?;
    let rows = stmt.query_map([], site_from_row)?;

    let mut sites = Vec::new();
    for row in rows {
        sites.push(row?);
    }
    Ok(sites)
}

pub fn get_site(
    conn: &Connection,
    id: i64,
    scope: &AccessScope,
) -> Result<Option<Site>, DatabaseError> {
    if !scope.contains(id) {
        return Ok(None);
    }
    let mut stmt = conn.prepare(&format!("SELECT {SITE_COLS} FROM sites WHERE id = ?1"))?;
    match stmt.query_row(params![id], site_from_row) {
        Ok(site) => Ok(Some(site)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_site(
    conn: &Connection,
    id: i64,
    patch: &SitePatch,
) -> Result<Option<Site>, DatabaseError> {
    if patch.is_empty() {
        return Err(DatabaseError::NothingToUpdate);
    }

    let mut sets: Vec<&str> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();
    if let Some(name) = &patch.name {
        sets.push("name = ?");
        values.push(Box::new(name.clone()));
    }
    if let Some(address) = &patch.address {
        sets.push("address = ?");
        values.push(Box::new(address.clone()));
    }
    if let Some(city) = &patch.city {
        sets.push("city = ?");
        values.push(Box::new(city.clone()));
    }
    if let Some(state) = &patch.state {
        sets.push("state = ?");
        values.push(Box::new(state.clone()));
    }
    if let Some(zip) = &patch.zip {
        sets.push("zip = ?");
        values.push(Box::new(zip.clone()));
    }
    if let Some(is_active) = patch.is_active {
        sets.push("is_active = ?");
        values.push(Box::new(is_active));
    }
    values.push(Box::new(id));

    let updated = conn.execute(
        &format!("UPDATE sites SET {} WHERE id = ?", sets.join(", ")),
        params_from_iter(values.iter().map(|v| v.as_ref())),
    )?;
    if updated == 0 {
        return Ok(None);
    }
    get_site(conn, id, &AccessScope::AllSites)
}

/// Delete a site. Buildings cascade away with it; the delete is blocked
/// with a conflict while users reference the site as their primary site
/// or patients belong to it.
pub fn delete_site(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let deleted = conn
        .execute("DELETE FROM sites WHERE id = ?1", params![id])
        .map_err(|e| {
            constraint_conflict(e, "Site is still referenced by users or patients")
        })?;
    Ok(deleted > 0)
}

/// All sites in scope, each with its buildings — combined reference
/// data for client pickers.
pub fn sites_with_buildings(
    conn: &Connection,
    scope: &AccessScope,
) -> Result<Vec<SiteWithBuildings>, DatabaseError> {
    let sites = list_sites(conn, scope)?;
    let mut out = Vec::with_capacity(sites.len());
    for site in sites {
        let buildings = building::buildings_by_site(conn, site.id, scope)?;
        out.push(SiteWithBuildings { site, buildings });
    }
    Ok(out)
}
