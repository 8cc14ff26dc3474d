pub mod admin;
pub mod export;
pub mod health;
pub mod public;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::path::Path;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::warn;

use crate::auth::require_admin;
use crate::state::AppState;
use crate::supabase::Query;

/// JSON API bodies are small; uploads get their own, configurable limit.
const API_BODY_LIMIT: usize = 1024 * 1024;

/// List reads are consistently newest-first, both for the dashboard and for
/// the "most recent" analytics slices.
pub(crate) fn newest_first() -> Query {
    Query::param("order", "created_at.desc")
}

/// Builds the full API router: public form/listing routes, the admin login,
/// and the gated admin group. CORS, tracing, and static file serving are
/// layered on top by the binary.
pub fn router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/quotes", post(public::submit_quote))
        .route("/api/contacts", post(public::submit_contact))
        .route("/api/jobs", get(public::list_jobs))
        .route("/api/resources", get(public::list_resources))
        .route("/api/admin/login", post(admin::login))
        .layer(RequestBodyLimitLayer::new(API_BODY_LIMIT));

    let admin_routes = Router::new()
        .route("/api/admin/quotes", get(admin::list_quotes))
        .route("/api/admin/contacts", get(admin::list_contacts))
        .route("/api/admin/jobs", get(admin::list_jobs).post(admin::create_job))
        .route(
            "/api/admin/resources",
            get(admin::list_resources).post(admin::create_resource),
        )
        .route("/api/admin/analytics", get(admin::analytics))
        .route("/api/admin/export/{table}", get(export::export_table_csv))
        .route("/api/admin/export-all/xlsx", get(export::export_all_xlsx))
        .layer(RequestBodyLimitLayer::new(API_BODY_LIMIT))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ));

    let upload_routes = Router::new()
        .route("/api/admin/upload", post(admin::upload))
        .layer(DefaultBodyLimit::max(state.config.max_upload_body_bytes))
        .layer(RequestBodyLimitLayer::new(
            state.config.max_upload_body_bytes,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .merge(upload_routes)
        .with_state(state)
}

/// Mounts the built website as the router's fallback, serving `index.html`
/// for client-side routes. A configured but missing directory logs a warning
/// and leaves the API surface as-is.
pub fn with_spa_fallback(router: Router, static_dir: Option<&Path>) -> Router {
    let Some(dir) = static_dir else {
        return router;
    };
    if !dir.is_dir() {
        warn!("Static dir {} does not exist, serving API only", dir.display());
        return router;
    }
    let spa = ServeDir::new(dir).not_found_service(ServeFile::new(dir.join("index.html")));
    router.fallback_service(spa)
}
