//! Token authentication middleware.
//!
//! Extracts the signed token from the `auth_token` cookie (preferred)
//! or the `Authorization: Bearer` header, verifies signature + expiry,
//! and injects `AuthUser` into request extensions for downstream
//! handlers. Verification failure is a hard 401 before any business
//! logic runs — never a silent downgrade to anonymous.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthUser};
use crate::auth::token;

/// Cookie name carrying the auth token.
pub const AUTH_COOKIE: &str = "auth_token";

/// Require a verified token on the request.
///
/// Accesses `ApiContext` from request extensions (injected by the
/// Extension layer).
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let raw_token =
        token_from_cookie(&req).or_else(|| token_from_bearer(&req)).ok_or(ApiError::Unauthorized)?;

    let claims = token::verify(ctx.config.token_secret.as_bytes(), &raw_token)?;

    req.extensions_mut().insert(AuthUser { claims });
    Ok(next.run(req).await)
}

fn token_from_cookie(req: &Request<axum::body::Body>) -> Option<String> {
    let cookies = req.headers().get("Cookie")?.to_str().ok()?;
    for pair in cookies.split(';') {
        let Some((name, value)) = pair.trim().split_once('=') else {
            continue;
        };
        if name == AUTH_COOKIE && !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}

fn token_from_bearer(req: &Request<axum::body::Body>) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}
