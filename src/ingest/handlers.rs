use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument};

use crate::auth::repo_types::User;
use crate::dates::parse_period_bound;
use crate::error::ApiError;
use crate::ingest::services::{run_import, ImportSummary};
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/files/upload", post(upload))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

/// Multipart upload: `file` (the CSV report) plus `email`, `fromDate` and
/// `toDate` text fields. The period bounds come from the caller, not from
/// the file, and are shared by every row in the upload.
#[instrument(skip(state, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ImportSummary>>, ApiError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut email: Option<String> = None;
    let mut from_raw: Option<String> = None;
    let mut to_raw: Option<String> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("unreadable upload: {e}")))?;
                file = Some((filename, data));
            }
            Some("email") => email = Some(read_text(field).await?),
            Some("fromDate") => from_raw = Some(read_text(field).await?),
            Some("toDate") => to_raw = Some(read_text(field).await?),
            _ => {}
        }
    }

    let (filename, payload) =
        file.ok_or_else(|| ApiError::BadRequest("No file uploaded".into()))?;
    if !filename.to_ascii_lowercase().ends_with(".csv") {
        return Err(ApiError::BadRequest("Invalid file type".into()));
    }

    let email = email
        .ok_or_else(|| ApiError::BadRequest("email is required".into()))?
        .trim()
        .to_lowercase();
    let from_date = from_raw
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("fromDate is required".into()))
        .and_then(|v| parse_period_bound(v).map_err(|e| ApiError::BadRequest(e.to_string())))?;
    let to_date = to_raw
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("toDate is required".into()))
        .and_then(|v| parse_period_bound(v).map_err(|e| ApiError::BadRequest(e.to_string())))?;

    // The owner must resolve before any row is processed.
    let owner = User::find_by_email(&state.db, &email)
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;

    let summary = run_import(&state.db, owner.id, from_date, to_date, &payload).await?;

    info!(
        owner = %owner.id,
        imported = summary.imported,
        skipped = summary.skipped,
        "file processed"
    );
    Ok(ApiResponse::ok(summary))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("unreadable field: {e}")))
}
