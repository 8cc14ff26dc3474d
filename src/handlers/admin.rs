use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::constant_time_eq;
use crate::error::ApiError;
use crate::handlers::newest_first;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub username: String,
}

/// Admin login. Compares against the configured credentials in constant
/// time and issues a signed token on success. Failed attempts count toward
/// the per-IP rate limit; the mismatch message never says which field was
/// wrong.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let client_ip = addr.ip();

    if state.login_limiter.is_limited(client_ip) {
        warn!("rate limited login attempt from {client_ip}");
        return Err(ApiError::RateLimited);
    }

    let username_ok = constant_time_eq(
        request.username.as_bytes(),
        state.config.admin_username.as_bytes(),
    );
    let password_ok = constant_time_eq(
        request.password.as_bytes(),
        state.config.admin_password.as_bytes(),
    );
    if !(username_ok & password_ok) {
        state.login_limiter.record_failure(client_ip);
        warn!("failed admin login from {client_ip}");
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }

    state.login_limiter.clear(client_ip);
    let token = state.tokens.issue(&request.username);
    info!("admin login from {client_ip}");

    Ok(Json(LoginResponse {
        token,
        user: UserInfo {
            username: request.username,
        },
    }))
}

async fn list_table(state: &AppState, table: &str) -> Result<Json<Value>, ApiError> {
    let rows = state.supabase.select_all(table, Some(&newest_first())).await?;
    Ok(Json(Value::Array(rows)))
}

pub async fn list_quotes(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    list_table(&state, "quotes").await
}

pub async fn list_contacts(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    list_table(&state, "contacts").await
}

pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    list_table(&state, "jobs").await
}

pub async fn list_resources(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    list_table(&state, "resources").await
}

/// Job posting fields an admin may set. Deserializing through this struct
/// drops any column the client should not control.
#[derive(Debug, Deserialize, Serialize)]
pub struct JobCreate {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ResourceCreate {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

async fn create_row<T: Serialize>(
    state: &AppState,
    table: &str,
    body: &T,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let row = serde_json::to_value(body)
        .map_err(|e| ApiError::Internal(format!("serialize {table} row: {e}")))?;
    let created = state.supabase.insert(table, &row).await?;
    info!("created {table} row");
    Ok((StatusCode::CREATED, Json(created.into_json())))
}

pub async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<JobCreate>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    create_row(&state, "jobs", &body).await
}

pub async fn create_resource(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResourceCreate>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    create_row(&state, "resources", &body).await
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub counts: TableCounts,
    pub recent_quotes: Vec<Value>,
    pub recent_contacts: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct TableCounts {
    pub quotes: usize,
    pub contacts: usize,
    pub jobs: usize,
    pub resources: usize,
}

/// Dashboard summary: row counts for all four tables plus the five most
/// recent quotes and contacts. The four reads run concurrently.
pub async fn analytics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalyticsSummary>, ApiError> {
    let order = newest_first();
    let (quotes, contacts, jobs, resources) = tokio::try_join!(
        state.supabase.select_all("quotes", Some(&order)),
        state.supabase.select_all("contacts", Some(&order)),
        state.supabase.select_all("jobs", Some(&order)),
        state.supabase.select_all("resources", Some(&order)),
    )?;

    let counts = TableCounts {
        quotes: quotes.len(),
        contacts: contacts.len(),
        jobs: jobs.len(),
        resources: resources.len(),
    };
    let recent_quotes = quotes.into_iter().take(5).collect();
    let recent_contacts = contacts.into_iter().take(5).collect();

    Ok(Json(AnalyticsSummary {
        counts,
        recent_quotes,
        recent_contacts,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub bucket: String,
    pub path: String,
    pub file_base64: String,
    #[serde(rename = "contentType", alias = "content_type", default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub url: String,
}

/// Decodes a base64 file payload and stores it in the hosted object store,
/// replying with the public read URL for the uploaded object.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
    // browsers often hand over full data URLs; accept those too
    let encoded = request
        .file_base64
        .rsplit_once(";base64,")
        .map(|(_, tail)| tail)
        .unwrap_or(&request.file_base64);

    let bytes = STANDARD
        .decode(encoded)
        .map_err(|_| ApiError::BadRequest("file_base64 is not valid base64".to_string()))?;
    let content_type = request
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream");

    state
        .supabase
        .upload_object(&request.bucket, &request.path, bytes, content_type)
        .await?;
    let url = state
        .supabase
        .public_object_url(&request.bucket, &request.path);
    info!("uploaded object to {}/{}", request.bucket, request.path);

    Ok(Json(UploadResponse { ok: true, url }))
}
