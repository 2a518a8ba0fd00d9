use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Role;

/// A user account as read from storage. The password hash never leaves
/// the repository layer — `UserRow` is the API-facing shape.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub primary_site_id: i64,
    pub assigned_site_ids: Vec<i64>,
    pub created_at: NaiveDateTime,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// User shape returned by list/detail endpoints: display name plus
/// site labels joined at read time.
#[derive(Debug, Clone, Serialize)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub primary_site_id: i64,
    pub assigned_site_ids: Vec<i64>,
    pub primary_site: Option<String>,
    pub assigned_sites: Vec<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub primary_site_id: i64,
    #[serde(default)]
    pub assigned_site_ids: Vec<i64>,
}

/// Partial update for a user. `new_password` is hashed before storage;
/// `assigned_site_ids` replaces the whole assigned set when present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub primary_site_id: Option<i64>,
    pub assigned_site_ids: Option<Vec<i64>>,
    pub new_password: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && self.primary_site_id.is_none()
            && self.assigned_site_ids.is_none()
            && self.new_password.is_none()
    }
}
