use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::handlers::newest_first;
use crate::state::AppState;

/// Quote request form as the public site submits it. Known fields are typed;
/// anything else the form tacks on lands in `extra` and is preserved inside
/// the stored metadata object.
#[derive(Debug, Deserialize)]
pub struct QuoteSubmission {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub whatsapp: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    #[serde(default)]
    pub bill: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Maps a form submission onto the fixed `quotes` row shape. `whatsapp`
/// defaults to the phone number when the form left it out, and every
/// unrecognized form field is bucketed under `metadata` alongside the
/// authoritative `source: "public-form"` marker.
pub fn map_quote(submission: QuoteSubmission) -> Value {
    let whatsapp = match submission.whatsapp {
        Some(w) if !w.trim().is_empty() => w,
        _ => submission.phone.clone(),
    };

    let mut metadata = Map::new();
    for (key, value) in submission.extra {
        metadata.insert(key, value);
    }
    // the source marker always wins
    metadata.insert("source".to_string(), json!("public-form"));

    let mut row = Map::new();
    row.insert("name".to_string(), json!(submission.name));
    row.insert("phone".to_string(), json!(submission.phone));
    row.insert("whatsapp".to_string(), json!(whatsapp));
    if let Some(email) = submission.email {
        row.insert("email".to_string(), json!(email));
    }
    if let Some(pincode) = submission.pincode {
        row.insert("pincode".to_string(), json!(pincode));
    }
    if let Some(bill) = submission.bill {
        row.insert("bill".to_string(), json!(bill));
    }
    row.insert("metadata".to_string(), Value::Object(metadata));

    Value::Object(row)
}

pub async fn submit_quote(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<QuoteSubmission>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let row = map_quote(submission);
    let created = state.supabase.insert("quotes", &row).await?;
    info!("stored quote request");
    Ok((StatusCode::CREATED, Json(created.into_json())))
}

/// Contact form with a strict allow-list: only these five fields are ever
/// forwarded, whatever else the client sends.
#[derive(Debug, Deserialize)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
}

pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<ContactSubmission>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut row = Map::new();
    row.insert("name".to_string(), json!(submission.name));
    row.insert("email".to_string(), json!(submission.email));
    if let Some(phone) = submission.phone {
        row.insert("phone".to_string(), json!(phone));
    }
    if let Some(subject) = submission.subject {
        row.insert("subject".to_string(), json!(subject));
    }
    row.insert("message".to_string(), json!(submission.message));

    let created = state.supabase.insert("contacts", &Value::Object(row)).await?;
    info!("stored contact message");
    Ok((StatusCode::CREATED, Json(created.into_json())))
}

pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let rows = state.supabase.select_all("jobs", Some(&newest_first())).await?;
    Ok(Json(Value::Array(rows)))
}

pub async fn list_resources(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let rows = state
        .supabase
        .select_all("resources", Some(&newest_first()))
        .await?;
    Ok(Json(Value::Array(rows)))
}
