//! API router.
//!
//! Two route groups: open (health, login, logout) and protected
//! (everything else, behind the token middleware). The CORS layer
//! allows the browser client origin with credentials, since the cookie
//! is the preferred credential transport.
//!
//! Middleware uses `Extension<ApiContext>` (injected as the outermost
//! layer); endpoint handlers use `State<ApiContext>`.

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Browser client origin allowed by CORS. Swap for the deployed
/// frontend URL in production.
const ALLOWED_ORIGIN: &str = "http://localhost:5173";

/// Build the full API router.
pub fn api_router(ctx: ApiContext) -> Router {
    // Protected routes — require a verified token.
    let protected = Router::new()
        .route("/auth/profile", get(endpoints::auth::profile))
        .route(
            "/sites",
            get(endpoints::sites::list).post(endpoints::sites::create),
        )
        .route("/sites/with-buildings", get(endpoints::sites::with_buildings))
        .route(
            "/sites/:id",
            get(endpoints::sites::get)
                .put(endpoints::sites::update)
                .delete(endpoints::sites::delete),
        )
        .route(
            "/buildings",
            get(endpoints::buildings::list).post(endpoints::buildings::create),
        )
        .route("/buildings/site/:site_id", get(endpoints::buildings::by_site))
        .route(
            "/buildings/:id",
            get(endpoints::buildings::get)
                .put(endpoints::buildings::update)
                .delete(endpoints::buildings::delete),
        )
        .route(
            "/users",
            get(endpoints::users::list).post(endpoints::users::create),
        )
        .route("/users/site/:site_id", get(endpoints::users::by_site))
        .route(
            "/users/:id",
            get(endpoints::users::get)
                .put(endpoints::users::update)
                .delete(endpoints::users::delete),
        )
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::create),
        )
        .route("/patients/site/:site_id", get(endpoints::patients::by_site))
        .route(
            "/patients/:id",
            get(endpoints::patients::get)
                .put(endpoints::patients::update)
                .delete(endpoints::patients::delete),
        )
        .route(
            "/activities",
            get(endpoints::activities::list).post(endpoints::activities::create),
        )
        .route(
            "/activities/patient/:patient_id",
            get(endpoints::activities::by_patient),
        )
        .route(
            "/activities/:id",
            get(endpoints::activities::get)
                .put(endpoints::activities::update)
                .delete(endpoints::activities::delete),
        )
        .route("/medical-records", post(endpoints::medical_records::create))
        .route(
            "/medical-records/:id",
            get(endpoints::medical_records::get)
                .put(endpoints::medical_records::update)
                .delete(endpoints::medical_records::delete),
        )
        .route(
            "/medical-records/patient/:patient_id",
            get(endpoints::medical_records::by_patient),
        )
        .route(
            "/medical-records/patient/:patient_id/latest",
            get(endpoints::medical_records::latest),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    // Open routes — no credential required.
    let open = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/login", post(endpoints::auth::login))
        .route("/auth/logout", post(endpoints::auth::logout))
        .with_state(ctx);

    Router::new().merge(protected).merge(open).layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(HeaderValue::from_static(ALLOWED_ORIGIN))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
