//! User store. Accounts carry a primary site plus an assigned-site set
//! (`user_sites`); the password hash never leaves this module's `User`
//! shape, which only the login path reads.

use std::str::FromStr;

use rusqlite::{params, params_from_iter, Connection, ToSql};

use super::{like_pattern, order_clause, QueryParts};
use crate::auth::AccessScope;
use crate::db::{constraint_conflict, DatabaseError};
use crate::models::{NewUser, Page, Pagination, Role, User, UserFilter, UserPatch, UserRow};

const DUPLICATE_EMAIL: &str = "An account with this email already exists";

const SELECT: &str = "SELECT u.id, u.first_name || ' ' || u.last_name AS name, u.email,
        u.role, u.primary_site_id, sp.name AS primary_site, u.created_at";

const FROM: &str = "FROM users u LEFT JOIN sites sp ON sp.id = u.primary_site_id";

const SORT_KEYS: &[(&str, &str)] = &[
    ("name", "u.first_name || ' ' || u.last_name"),
    ("email", "u.email"),
    ("role", "u.role"),
    ("primary_site", "sp.name"),
    ("created_at", "u.created_at"),
];

const DEFAULT_ORDER: &str = "u.last_name, u.first_name";

struct UserRawRow {
    id: i64,
    name: String,
    email: String,
    role: String,
    primary_site_id: i64,
    primary_site: Option<String>,
    created_at: chrono::NaiveDateTime,
}

fn raw_from_row(row: &rusqlite::Row) -> rusqlite::Result<UserRawRow> {
    Ok(UserRawRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        primary_site_id: row.get(4)?,
        primary_site: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn user_row_from_raw(conn: &Connection, raw: UserRawRow) -> Result<UserRow, DatabaseError> {
    let (assigned_site_ids, assigned_sites) = assigned_sites(conn, raw.id)?;
    Ok(UserRow {
        id: raw.id,
        name: raw.name,
        email: raw.email,
        role: Role::from_str(&raw.role)?,
        primary_site_id: raw.primary_site_id,
        assigned_site_ids,
        primary_site: raw.primary_site,
        assigned_sites,
        created_at: raw.created_at,
    })
}

/// Assigned site ids and names for one user, ordered by site id.
fn assigned_sites(
    conn: &Connection,
    user_id: i64,
) -> Result<(Vec<i64>, Vec<String>), DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT us.site_id, s.name FROM user_sites us
         JOIN sites s ON s.id = us.site_id
         WHERE us.user_id = ?1 ORDER BY us.site_id",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut ids = Vec::new();
    let mut names = Vec::new();
    for row in rows {
        let (id, name) = row?;
        ids.push(id);
        names.push(name);
    }
    Ok((ids, names))
}

/// Create a user plus their assigned-site rows in one transaction.
/// The caller supplies the already-hashed password.
pub fn insert_user(
    conn: &Connection,
    user: &NewUser,
    password_hash: &str,
) -> Result<UserRow, DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO users (first_name, last_name, email, password_hash, role, primary_site_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.first_name,
            user.last_name,
            user.email.to_lowercase(),
            password_hash,
            user.role.as_str(),
            user.primary_site_id,
        ],
    )
    .map_err(|e| constraint_conflict(e, DUPLICATE_EMAIL))?;
    let id = tx.last_insert_rowid();

    for site_id in &user.assigned_site_ids {
        tx.execute(
            "INSERT OR IGNORE INTO user_sites (user_id, site_id) VALUES (?1, ?2)",
            params![id, site_id],
        )
        .map_err(|e| constraint_conflict(e, "Assigned site does not exist"))?;
    }
    tx.commit()?;

    get_user(conn, id)?.ok_or(DatabaseError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
}

/// Case-insensitive credential lookup for login. Returns the full
/// storage shape including the password hash.
pub fn find_auth_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<User>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, first_name, last_name, email, password_hash, role, primary_site_id, created_at
         FROM users WHERE email = ?1 COLLATE NOCASE",
    )?;
    let result = stmt.query_row(params![email], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, i64>(6)?,
            row.get::<_, chrono::NaiveDateTime>(7)?,
        ))
    });

    let (id, first_name, last_name, email, password_hash, role, primary_site_id, created_at) =
        match result {
            Ok(tuple) => tuple,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
    let (assigned_site_ids, _) = assigned_sites(conn, id)?;

    Ok(Some(User {
        id,
        first_name,
        last_name,
        email,
        password_hash,
        role: Role::from_str(&role)?,
        primary_site_id,
        assigned_site_ids,
        created_at,
    }))
}

pub fn list_users(
    conn: &Connection,
    filter: &UserFilter,
    page: &Pagination,
    scope: &AccessScope,
) -> Result<Page<UserRow>, DatabaseError> {
    if scope.is_empty() {
        return Ok(Page::empty());
    }

    let mut parts = QueryParts::new();
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        parts.bind_many(
            "(LOWER(u.first_name || ' ' || u.last_name) LIKE LOWER(?)
              OR LOWER(u.email) LIKE LOWER(?)
              OR CAST(u.id AS TEXT) LIKE ?)",
            vec![
                Box::new(pattern.clone()),
                Box::new(pattern.clone()),
                Box::new(pattern),
            ],
        );
    }
    if let Some(role) = filter.role {
        parts.bind("u.role = ?", role.as_str());
    }
    if let Some(site_id) = filter.site_id {
        parts.bind_many(
            "(u.primary_site_id = ?
              OR EXISTS (SELECT 1 FROM user_sites us WHERE us.user_id = u.id AND us.site_id = ?))",
            vec![Box::new(site_id), Box::new(site_id)],
        );
    }
    // Non-admin callers only see users sharing at least one of their
    // sites, by primary or assigned membership.
    if let Some(primary_cond) = scope.sql_condition("u.primary_site_id") {
        let assigned_cond = scope
            .sql_condition("us.site_id")
            .unwrap_or_else(|| "1 = 1".into());
        parts.condition(format!(
            "({primary_cond} OR EXISTS (SELECT 1 FROM user_sites us WHERE us.user_id = u.id AND {assigned_cond}))"
        ));
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
    let mut raws = Vec::new();
    for row in rows {
        raws.push(row?);
    }

    let mut items = Vec::with_capacity(raws.len());
    for raw in raws {
        items.push(user_row_from_raw(conn, raw)?);
    }
    Ok(Page { items, total })
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<UserRow>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{SELECT} {FROM} WHERE u.id = ?1"))?;
    let raw = match stmt.query_row(params![id], raw_from_row) {
        Ok(raw) => raw,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(user_row_from_raw(conn, raw)?))
}

/// Users attached to one site, by primary or assigned membership.
/// Out-of-scope sites yield an empty list.
pub fn users_by_site(
    conn: &Connection,
    site_id: i64,
    scope: &AccessScope,
) -> Result<Vec<UserRow>, DatabaseError> {
    if !scope.contains(site_id) {
        return Ok(Vec::new());
    }
    let mut stmt = conn.prepare(&format!(
        "{SELECT} {FROM}
         WHERE u.primary_site_id = ?1
            OR EXISTS (SELECT 1 FROM user_sites us WHERE us.user_id = u.id AND us.site_id = ?1)
         ORDER BY {DEFAULT_ORDER}"
    ))?;
    let rows = stmt.query_map(params![site_id], raw_from_row)?;
    let mut raws = Vec::new();
    for row in rows {
        raws.push(row?);
    }

    let mut users = Vec::with_capacity(raws.len());
    for raw in raws {
        users.push(user_row_from_raw(conn, raw)?);
    }
    Ok(users)
}

/// Apply a user patch. `password_hash` is the pre-hashed replacement
/// when the patch carried `new_password`. A present `assigned_site_ids`
/// replaces the whole assigned set.
pub fn update_user(
    conn: &Connection,
    id: i64,
    patch: &UserPatch,
    password_hash: Option<&str>,
) -> Result<Option<UserRow>, DatabaseError> {
    if patch.is_empty() {
        return Err(DatabaseError::NothingToUpdate);
    }

    let tx = conn.unchecked_transaction()?;

    let exists: bool = tx.query_row(
        "SELECT EXISTS (SELECT 1 FROM users WHERE id = ?1)",
        params![id],
        |row| row.get(0),
    )?;
    if !exists {
        return Ok(None);
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
    if let Some(email) = &patch.email {
        sets.push("email = ?");
        values.push(Box::new(email.to_lowercase()));
    }
    if let Some(role) = patch.role {
        sets.push("role = ?");
        values.push(Box::new(role.as_str()));
    }
    if let Some(primary_site_id) = patch.primary_site_id {
        sets.push("primary_site_id = ?");
        values.push(Box::new(primary_site_id));
    }
    if let Some(hash) = password_hash {
        sets.push("password_hash = ?");
        values.push(Box::new(hash.to_string()));
    }

    if !sets.is_empty() {
        values.push(Box::new(id));
        tx.execute(
            &format!("UPDATE users SET {} WHERE id = ?", sets.join(", ")),
            params_from_iter(values.iter().map(|v| v.as_ref())),
        )
        .map_err(|e| constraint_conflict(e, DUPLICATE_EMAIL))?;
    }

    if let Some(site_ids) = &patch.assigned_site_ids {
        tx.execute("DELETE FROM user_sites WHERE user_id = ?1", params![id])?;
        for site_id in site_ids {
            tx.execute(
                "INSERT OR IGNORE INTO user_sites (user_id, site_id) VALUES (?1, ?2)",
                params![id, site_id],
            )
            .map_err(|e| constraint_conflict(e, "Assigned site does not exist"))?;
        }
    }
    tx.commit()?;

    get_user(conn, id)
}

pub fn delete_user(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::site::insert_site;
    use crate::models::{NewSite, Sort};

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

    fn new_user(email: &str, role: Role, primary: i64, assigned: Vec<i64>) -> NewUser {
        NewUser {
            first_name: "Dana".into(),
            last_name: "Reyes".into(),
            email: email.into(),
            password: String::new(),
            role,
            primary_site_id: primary,
            assigned_site_ids: assigned,
        }
    }

    #[test]
    fn insert_lowercases_email_and_stores_assignments() {
        let conn = open_memory_database().unwrap();
        let a = seed_site(&conn, "A");
        let b = seed_site(&conn, "B");

        let user = insert_user(
            &conn,
            &new_user("Dana.Reyes@Example.COM", Role::Nurse, a, vec![b]),
            "hash",
        )
        .unwrap();

        assert_eq!(user.email, "dana.reyes@example.com");
        assert_eq!(user.name, "Dana Reyes");
        assert_eq!(user.primary_site_id, a);
        assert_eq!(user.assigned_site_ids, vec![b]);
        assert_eq!(user.assigned_sites, vec!["B".to_string()]);
    }

    #[test]
    fn duplicate_email_conflicts_case_insensitively() {
        let conn = open_memory_database().unwrap();
        let a = seed_site(&conn, "A");
        insert_user(&conn, &new_user("dana@example.com", Role::Nurse, a, vec![]), "h").unwrap();

        let err = insert_user(
            &conn,
            &new_user("DANA@EXAMPLE.COM", Role::Admin, a, vec![]),
            "h",
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[test]
    fn find_auth_is_case_insensitive_and_carries_hash() {
        let conn = open_memory_database().unwrap();
        let a = seed_site(&conn, "A");
        let b = seed_site(&conn, "B");
        insert_user(
            &conn,
            &new_user("dana@example.com", Role::Pharmacist, a, vec![b]),
            "stored-hash",
        )
        .unwrap();

        let user = find_auth_by_email(&conn, "DANA@example.COM").unwrap().unwrap();
        assert_eq!(user.password_hash, "stored-hash");
        assert_eq!(user.role, Role::Pharmacist);
        assert_eq!(user.primary_site_id, a);
        assert_eq!(user.assigned_site_ids, vec![b]);

        assert!(find_auth_by_email(&conn, "nobody@example.com")
            .unwrap()
            .is_none());
    }

    #[test]
    fn list_filters_by_role_and_search() {
        let conn = open_memory_database().unwrap();
        let a = seed_site(&conn, "A");
        insert_user(&conn, &new_user("nurse@example.com", Role::Nurse, a, vec![]), "h").unwrap();
        let mut admin = new_user("admin@example.com", Role::Admin, a, vec![]);
        admin.first_name = "Avery".into();
        admin.last_name = "Quinn".into();
        insert_user(&conn, &admin, "h").unwrap();

        let by_role = UserFilter {
            role: Some(Role::Admin),
            ..Default::default()
        };
        let page = list_users(&conn, &by_role, &Pagination::default(), &AccessScope::AllSites)
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].role, Role::Admin);

        let by_search = UserFilter {
            search: Some("QUINN".into()),
            ..Default::default()
        };
        let page = list_users(
            &conn,
            &by_search,
            &Pagination::default(),
            &AccessScope::AllSites,
        )
        .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "Avery Quinn");
    }

    #[test]
    fn non_admin_list_is_scoped_to_shared_sites() {
        let conn = open_memory_database().unwrap();
        let a = seed_site(&conn, "A");
        let b = seed_site(&conn, "B");
        // Primary at A
        insert_user(&conn, &new_user("at-a@example.com", Role::Nurse, a, vec![]), "h").unwrap();
        // Primary at B, assigned to A — still visible from A
        insert_user(
            &conn,
            &new_user("at-b-assigned-a@example.com", Role::Nurse, b, vec![a]),
            "h",
        )
        .unwrap();
        // Only at B — invisible from A
        insert_user(&conn, &new_user("at-b@example.com", Role::Nurse, b, vec![]), "h").unwrap();

        let scope = AccessScope::for_user(Role::Nurse, a, &[]);
        let page = list_users(
            &conn,
            &UserFilter::default(),
            &Pagination::default(),
            &scope,
        )
        .unwrap();
        let emails: Vec<&str> = page.items.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(page.total, 2);
        assert!(emails.contains(&"at-a@example.com"));
        assert!(emails.contains(&"at-b-assigned-a@example.com"));
    }

    #[test]
    fn default_order_is_last_then_first_name() {
        let conn = open_memory_database().unwrap();
        let a = seed_site(&conn, "A");
        let mut zed = new_user("zed@example.com", Role::Nurse, a, vec![]);
        zed.last_name = "Zimmer".into();
        insert_user(&conn, &zed, "h").unwrap();
        let mut abe = new_user("abe@example.com", Role::Nurse, a, vec![]);
        abe.last_name = "Abbott".into();
        insert_user(&conn, &abe, "h").unwrap();

        let page = list_users(
            &conn,
            &UserFilter::default(),
            &Pagination::default(),
            &AccessScope::AllSites,
        )
        .unwrap();
        assert_eq!(page.items[0].email, "abe@example.com");
        assert_eq!(page.items[1].email, "zed@example.com");
    }

    #[test]
    fn sort_by_email_descending() {
        let conn = open_memory_database().unwrap();
        let a = seed_site(&conn, "A");
        insert_user(&conn, &new_user("aaa@example.com", Role::Nurse, a, vec![]), "h").unwrap();
        insert_user(&conn, &new_user("zzz@example.com", Role::Nurse, a, vec![]), "h").unwrap();

        let filter = UserFilter {
            sort: Sort {
                field: Some("email".into()),
                direction: Some("desc".into()),
            },
            ..Default::default()
        };
        let page = list_users(
            &conn,
            &filter,
            &Pagination::default(),
            &AccessScope::AllSites,
        )
        .unwrap();
        assert_eq!(page.items[0].email, "zzz@example.com");
    }

    #[test]
    fn users_by_site_includes_assigned_membership() {
        let conn = open_memory_database().unwrap();
        let a = seed_site(&conn, "A");
        let b = seed_site(&conn, "B");
        insert_user(
            &conn,
            &new_user("assigned@example.com", Role::Nurse, b, vec![a]),
            "h",
        )
        .unwrap();
        insert_user(&conn, &new_user("primary@example.com", Role::Nurse, a, vec![]), "h")
            .unwrap();
        insert_user(&conn, &new_user("other@example.com", Role::Nurse, b, vec![]), "h")
            .unwrap();

        let users = users_by_site(&conn, a, &AccessScope::AllSites).unwrap();
        assert_eq!(users.len(), 2);
    }

    #[test]
    fn patch_replaces_assigned_set() {
        let conn = open_memory_database().unwrap();
        let a = seed_site(&conn, "A");
        let b = seed_site(&conn, "B");
        let c = seed_site(&conn, "C");
        let user = insert_user(
            &conn,
            &new_user("dana@example.com", Role::Nurse, a, vec![b]),
            "h",
        )
        .unwrap();

        let patch = UserPatch {
            assigned_site_ids: Some(vec![c]),
            ..Default::default()
        };
        let updated = update_user(&conn, user.id, &patch, None).unwrap().unwrap();
        assert_eq!(updated.assigned_site_ids, vec![c]);
        // Everything else untouched
        assert_eq!(updated.email, user.email);
        assert_eq!(updated.role, user.role);
        assert_eq!(updated.primary_site_id, a);
    }

    #[test]
    fn password_patch_swaps_the_hash() {
        let conn = open_memory_database().unwrap();
        let a = seed_site(&conn, "A");
        let user = insert_user(
            &conn,
            &new_user("dana@example.com", Role::Nurse, a, vec![]),
            "old-hash",
        )
        .unwrap();

        let patch = UserPatch {
            new_password: Some("irrelevant-here".into()),
            ..Default::default()
        };
        update_user(&conn, user.id, &patch, Some("new-hash")).unwrap().unwrap();

        let auth = find_auth_by_email(&conn, "dana@example.com").unwrap().unwrap();
        assert_eq!(auth.password_hash, "new-hash");
    }

    #[test]
    fn empty_patch_is_rejected() {
        let conn = open_memory_database().unwrap();
        let a = seed_site(&conn, "A");
        let user = insert_user(&conn, &new_user("dana@example.com", Role::Nurse, a, vec![]), "h")
            .unwrap();
        let err = update_user(&conn, user.id, &UserPatch::default(), None).unwrap_err();
        assert!(matches!(err, DatabaseError::NothingToUpdate));
    }

    #[test]
    fn update_missing_user_is_none() {
        let conn = open_memory_database().unwrap();
        let patch = UserPatch {
            first_name: Some("X".into()),
            ..Default::default()
        };
        assert!(update_user(&conn, 404, &patch, None).unwrap().is_none());
    }

    #[test]
    fn delete_user_and_cascaded_assignments() {
        let conn = open_memory_database().unwrap();
        let a = seed_site(&conn, "A");
        let b = seed_site(&conn, "B");
        let user = insert_user(
            &conn,
            &new_user("dana@example.com", Role::Nurse, a, vec![b]),
            "h",
        )
        .unwrap();

        assert!(delete_user(&conn, user.id).unwrap());
        assert!(!delete_user(&conn, user.id).unwrap());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM user_sites", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
