use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::auth::extractors::{AdminUser, AuthUser};
use crate::books::{
    dto::{BookEntries, BookSummary, OwnedBook, UploadEvent, UserUploadEvents},
    repo,
    repo_types::Book,
    services,
};
use crate::dates::parse_period_bound;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/upload-events", get(upload_events))
        .route("/user/upload-events/all", get(upload_events_all))
        .route("/user/books", get(my_books))
        .route("/user/books/all", get(all_books))
        .route("/user/data/:from_date/:to_date", get(data_by_range))
}

/// Distinct reporting periods for the caller's books, newest first.
#[instrument(skip(state))]
pub async fn upload_events(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<Vec<UploadEvent>>>, ApiError> {
    let rows = repo::periods_for_user(&state.db, user_id).await?;
    Ok(ApiResponse::ok(services::dedupe_periods(&rows)))
}

/// Per-user deduplicated event lists across all owners.
#[instrument(skip(state))]
pub async fn upload_events_all(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
) -> Result<Json<ApiResponse<Vec<UserUploadEvents>>>, ApiError> {
    let rows = repo::periods_for_all(&state.db).await?;
    Ok(ApiResponse::ok(services::group_periods_by_user(&rows)))
}

#[instrument(skip(state))]
pub async fn my_books(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<Vec<BookSummary>>>, ApiError> {
    let books = Book::list_by_user(&state.db, user_id).await?;
    Ok(ApiResponse::ok(
        books.into_iter().map(BookSummary::from).collect(),
    ))
}

#[instrument(skip(state))]
pub async fn all_books(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
) -> Result<Json<ApiResponse<Vec<OwnedBook>>>, ApiError> {
    let books = Book::list_all(&state.db).await?;
    Ok(ApiResponse::ok(
        books.into_iter().map(OwnedBook::from).collect(),
    ))
}

/// Entries matching both bounds exactly, grouped by book.
#[instrument(skip(state))]
pub async fn data_by_range(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((from_raw, to_raw)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Vec<BookEntries>>>, ApiError> {
    let from_date =
        parse_period_bound(&from_raw).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let to_date = parse_period_bound(&to_raw).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let rows = repo::entries_by_exact_range(&state.db, user_id, from_date, to_date).await?;
    Ok(ApiResponse::ok(services::group_entries_by_book(rows)))
}
