//! User-account endpoints. Create/get/update/delete are admin-only;
//! the list is scoped for non-admin callers to users sharing at least
//! one of their sites.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::error::ApiError;
use crate::api::types::{filter_param, id_filter_param, ApiContext, AuthUser, PagedResponse};
use crate::auth::password;
use crate::db::repository::user as users;
use crate::models::{NewUser, Pagination, Role, Sort, UserFilter, UserPatch, UserRow};

#[derive(Deserialize)]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub role: Option<String>,
    pub site: Option<String>,
    #[serde(rename = "sortField")]
    pub sort_field: Option<String>,
    #[serde(rename = "sortDirection")]
    pub sort_direction: Option<String>,
}

/// `POST /users` (admin)
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Json(new_user): Json<NewUser>,
) -> Result<Json<UserRow>, ApiError> {
    user.require_admin()?;
    if new_user.first_name.trim().is_empty()
        || new_user.last_name.trim().is_empty()
        || new_user.email.trim().is_empty()
    {
        return Err(ApiError::BadRequest(
            "First name, last name and email are required".into(),
        ));
    }
    if new_user.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".into(),
        ));
    }

    let password_hash = password::hash_password(&new_user.password);
    let conn = ctx.db.conn()?;
    Ok(Json(users::insert_user(&conn, &new_user, &password_hash)?))
}

/// `GET /users`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<PagedResponse<UserRow>>, ApiError> {
    let pagination = Pagination::new(query.page, query.limit);
    let role = match filter_param(query.role.as_deref()) {
        None => None,
        Some(r) => Some(
            Role::from_str(r).map_err(|_| ApiError::BadRequest(format!("Invalid role filter: {r}")))?,
        ),
    };
    let filter = UserFilter {
        search: query.search,
        role,
        site_id: id_filter_param(query.site.as_deref(), "site")?,
        sort: Sort {
            field: query.sort_field,
            direction: query.sort_direction,
        },
    };

    let conn = ctx.db.conn()?;
    let page = users::list_users(&conn, &filter, &pagination, &user.scope())?;
    Ok(Json(PagedResponse::new(page, &pagination)))
}

/// `GET /users/:id` (admin)
pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<UserRow>, ApiError> {
    user.require_admin()?;
    let conn = ctx.db.conn()?;
    users::get_user(&conn, id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

/// `GET /users/site/:site_id` — users attached to a site, by primary
/// or assigned membership.
pub async fn by_site(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(site_id): Path<i64>,
) -> Result<Json<Vec<UserRow>>, ApiError> {
    let conn = ctx.db.conn()?;
    Ok(Json(users::users_by_site(&conn, site_id, &user.scope())?))
}

/// `PUT /users/:id` (admin). A present `new_password` is hashed here;
/// the store never sees plaintext.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<UserRow>, ApiError> {
    user.require_admin()?;
    if let Some(new_password) = &patch.new_password {
        if new_password.len() < 8 {
            return Err(ApiError::BadRequest(
                "Password must be at least 8 characters".into(),
            ));
        }
    }

    let password_hash = patch.new_password.as_deref().map(password::hash_password);
    let conn = ctx.db.conn()?;
    users::update_user(&conn, id, &patch, password_hash.as_deref())?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
}

/// `DELETE /users/:id` (admin)
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    user.require_admin()?;
    let conn = ctx.db.conn()?;
    if !users::delete_user(&conn, id)? {
        return Err(ApiError::NotFound("User not found".into()));
    }
    Ok(Json(DeleteResponse {
        message: "User deleted successfully",
    }))
}
