use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use rust_xlsxwriter::Workbook;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::auth::AdminPrincipal;
use crate::error::ApiError;
use crate::handlers::newest_first;
use crate::state::AppState;

const EXPORT_TABLES: [&str; 4] = ["quotes", "contacts", "jobs", "resources"];

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Quote-wraps a cell when it contains a comma, quote, or line break,
/// doubling embedded quotes.
fn csv_escape(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') || cell.contains('\r') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Renders one JSON value as CSV cell text: strings as-is, `null` empty,
/// nested objects/arrays as their JSON text.
fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        nested => nested.to_string(),
    }
}

/// Converts a row-set to CSV. Headers come from the first row's keys (sorted,
/// as JSON object keys are); rows missing a key render an empty cell. An
/// empty row-set produces an empty document with no header line.
fn rows_to_csv(rows: &[Value]) -> String {
    let Some(first) = rows.first().and_then(|r| r.as_object()) else {
        return String::new();
    };

    let headers: Vec<&String> = first.keys().collect();
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| csv_escape(h.as_str()))
            .collect::<Vec<_>>()
            .join(","),
    );

    for row in rows {
        let line = headers
            .iter()
            .map(|header| {
                row.get(header.as_str())
                    .map(|v| csv_escape(&csv_cell(v)))
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join(",");
        lines.push(line);
    }

    let mut csv = lines.join("\n");
    csv.push('\n');
    csv
}

fn attachment_response(filename: &str, content_type: &str, body: Vec<u8>) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(body))
        .unwrap_or_else(|_| {
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to build response").into_response()
        })
}

/// CSV export of one of the four fixed tables. Anything else is a 404, not a
/// forwarded query.
pub async fn export_table_csv(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<AdminPrincipal>,
    Path(table): Path<String>,
) -> Result<Response, ApiError> {
    if !EXPORT_TABLES.contains(&table.as_str()) {
        return Err(ApiError::NotFound(format!("no such export table: {table}")));
    }

    let rows = state.supabase.select_all(&table, Some(&newest_first())).await?;
    let csv = rows_to_csv(&rows);
    info!("{} exported {} ({} rows)", principal.username, table, rows.len());

    Ok(attachment_response(
        &format!("{table}.csv"),
        "text/csv; charset=utf-8",
        csv.into_bytes(),
    ))
}

fn write_sheet(
    workbook: &mut Workbook,
    name: &str,
    rows: &[Value],
) -> Result<(), rust_xlsxwriter::XlsxError> {
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(name)?;

    let Some(first) = rows.first().and_then(|r| r.as_object()) else {
        return Ok(());
    };
    let headers: Vec<&String> = first.keys().collect();

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, header.as_str())?;
    }
    for (row_idx, row) in rows.iter().enumerate() {
        let row_num = (row_idx + 1) as u32;
        for (col, header) in headers.iter().enumerate() {
            let col = col as u16;
            match row.get(header.as_str()) {
                None | Some(Value::Null) => {}
                Some(Value::Number(n)) => {
                    worksheet.write_number(row_num, col, n.as_f64().unwrap_or(0.0))?;
                }
                Some(Value::Bool(b)) => {
                    worksheet.write_boolean(row_num, col, *b)?;
                }
                Some(Value::String(s)) => {
                    worksheet.write_string(row_num, col, s)?;
                }
                Some(nested) => {
                    worksheet.write_string(row_num, col, nested.to_string())?;
                }
            }
        }
    }
    Ok(())
}

/// Workbook export: the four tables fetched concurrently, one worksheet per
/// table.
pub async fn export_all_xlsx(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<AdminPrincipal>,
) -> Result<Response, ApiError> {
    let order = newest_first();
    let (quotes, contacts, jobs, resources) = tokio::try_join!(
        state.supabase.select_all("quotes", Some(&order)),
        state.supabase.select_all("contacts", Some(&order)),
        state.supabase.select_all("jobs", Some(&order)),
        state.supabase.select_all("resources", Some(&order)),
    )?;

    let mut workbook = Workbook::new();
    let sheets = [
        ("quotes", &quotes),
        ("contacts", &contacts),
        ("jobs", &jobs),
        ("resources", &resources),
    ];
    for (name, rows) in sheets {
        write_sheet(&mut workbook, name, rows)
            .map_err(|e| ApiError::Internal(format!("workbook sheet {name}: {e}")))?;
    }
    let bytes = workbook
        .save_to_buffer()
        .map_err(|e| ApiError::Internal(format!("workbook serialize: {e}")))?;

    info!("{} exported full workbook", principal.username);
    Ok(attachment_response("export.xlsx", XLSX_CONTENT_TYPE, bytes))
}
