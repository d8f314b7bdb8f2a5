use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::{
    dto::{
        CreateUserRequest, CreatedUser, LoginRequest, ResetPasswordRequest, SessionCheck,
        UpdatePasswordRequest, UpdateRoleRequest, UserSummary,
    },
    extractors::{AdminUser, AuthUser, SESSION_COOKIE},
    repo_types::{is_valid_role, User},
    services::{hash_password, is_valid_email, verify_password, JwtKeys},
};
use crate::error::ApiError;
use crate::response::{Ack, ApiMessage, ApiResponse};
use crate::state::AppState;

/// Every account reset by an admin gets this password.
const DEFAULT_RESET_PASSWORD: &str = "1234567890";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/check", get(check))
        .route("/auth/logout", post(logout))
        .route("/auth/create-user", post(create_user))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/update-password", post(update_password))
        .route("/auth/delete-user/:id", delete(delete_user))
        .route("/auth/users", get(list_users))
        .route("/auth/update-role/:id", put(update_role))
}

fn session_cookie(token: String, max_age: Duration) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path("/")
        .max_age(max_age)
        .build()
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<Ack>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "email and password are required".into(),
        ));
    }

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or(ApiError::Unauthenticated("Invalid credentials"))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, "login with invalid password");
        return Err(ApiError::Unauthenticated("Invalid credentials"));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok((jar.add(session_cookie(token, keys.ttl)), Ack::ok()))
}

#[instrument(skip(state))]
pub async fn check(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<SessionCheck>>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;

    Ok(ApiResponse::ok(SessionCheck {
        is_user: true,
        is_admin: user.is_admin(),
    }))
}

#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<Ack>) {
    let cookie = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    (jar.remove(cookie), Ack::ok())
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
    Json(mut payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedUser>>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "email and password are required".into(),
        ));
    }
    if !is_valid_email(&payload.email) {
        return Err(ApiError::BadRequest("Invalid email".into()));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("User with this email already exists"));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &payload.email, payload.name.as_deref(), &hash).await?;

    info!(user_id = %user.id, email = %user.email, "user created");
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(CreatedUser { admin_id: user.id }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<ApiMessage>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::BadRequest("Email is required".into()));
    }

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;

    let hash = hash_password(DEFAULT_RESET_PASSWORD)?;
    User::update_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password reset by admin");
    Ok(ApiMessage::ok("Password reset to 1234567890"))
}

#[instrument(skip(state, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<ApiMessage>, ApiError> {
    if payload.old_password.is_empty() || payload.new_password.is_empty() {
        return Err(ApiError::BadRequest(
            "Old password and new password are required".into(),
        ));
    }

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::Unauthenticated("Invalid old password"))?;

    if !verify_password(&payload.old_password, &user.password_hash)? {
        return Err(ApiError::Unauthenticated("Invalid old password"));
    }

    let hash = hash_password(&payload.new_password)?;
    User::update_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password updated");
    Ok(ApiMessage::ok("Password updated successfully"))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiMessage>, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;

    User::delete(&state.db, user.id).await?;

    info!(user_id = %user.id, "user deleted");
    Ok(ApiMessage::ok("User deleted successfully"))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
) -> Result<Json<ApiResponse<Vec<UserSummary>>>, ApiError> {
    let users = User::list(&state.db).await?;
    Ok(ApiResponse::ok(
        users.into_iter().map(UserSummary::from).collect(),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_role(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<ApiResponse<UserSummary>>, ApiError> {
    if !is_valid_role(&payload.role) {
        return Err(ApiError::BadRequest("Invalid role provided".into()));
    }

    if User::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound("User not found"));
    }

    let updated = User::update_role(&state.db, id, &payload.role).await?;

    info!(user_id = %updated.id, role = %updated.role, "role updated");
    Ok(ApiResponse::ok(UserSummary::from(updated)))
}
