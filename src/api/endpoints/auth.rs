//! Session endpoints: login, logout, profile.
//!
//! Login verifies credentials and issues the signed token both as an
//! HttpOnly cookie (preferred transport) and in the response body for
//! bearer use. "No such email" and "wrong password" are distinguished
//! for UX — both deny.

use axum::http::header::SET_COOKIE;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::extract::State;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::middleware::auth::AUTH_COOKIE;
use crate::api::types::{ApiContext, AuthUser};
use crate::auth::{password, token, Claims};
use crate::db::repository::user as users;
use crate::models::Role;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: SessionUser,
}

/// User summary returned alongside the token.
#[derive(Serialize)]
pub struct SessionUser {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub primary_site_id: i64,
    pub assigned_site_ids: Vec<i64>,
}

/// `POST /auth/login`
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required".into()));
    }

    let conn = ctx.db.conn()?;
    let user = users::find_auth_by_email(&conn, &body.email)?
        .ok_or_else(|| ApiError::NotFound("No account found for this email".into()))?;

    if !password::verify_password(&body.password, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        name: user.display_name(),
        role: user.role,
        primary_site_id: user.primary_site_id,
        assigned_site_ids: user.assigned_site_ids.clone(),
        iat: now,
        exp: now + ctx.config.token_ttl_secs,
    };
    let access_token = token::sign(ctx.config.token_secret.as_bytes(), &claims)?;

    tracing::info!(user_id = user.id, "login");

    let cookie = format!(
        "{AUTH_COOKIE}={access_token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ctx.config.token_ttl_secs
    );
    let mut response = Json(LoginResponse {
        access_token,
        user: SessionUser {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
            primary_site_id: user.primary_site_id,
            assigned_site_ids: user.assigned_site_ids,
        },
    })
    .into_response();
    response.headers_mut().insert(
        SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(|e| ApiError::Internal(e.to_string()))?,
    );
    Ok(response)
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub message: &'static str,
}

/// `POST /auth/logout` — clear the cookie.
pub async fn logout() -> Response {
    let cookie = format!("{AUTH_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    let mut response = Json(LogoutResponse {
        message: "Logged out",
    })
    .into_response();
    if let Ok(val) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(SET_COOKIE, val);
    }
    response
}

/// `GET /auth/profile` — echo the verified claims.
pub async fn profile(Extension(user): Extension<AuthUser>) -> Json<Claims> {
    Json(user.claims)
}
