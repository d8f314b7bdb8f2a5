use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;
use uuid::Uuid;

use crate::auth::{repo_types::User, services::JwtKeys};
use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "token";

/// Validates the session cookie and yields the subject id. No cookie is
/// unauthenticated; a cookie that fails verification is forbidden.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .ok_or(ApiError::Unauthenticated("Unauthorized"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token.value()).map_err(|_| {
            warn!("invalid or expired session token");
            ApiError::Forbidden("Invalid token")
        })?;

        Ok(AuthUser(claims.sub))
    }
}

/// Same cookie check as [`AuthUser`], then loads the user and requires the
/// stored role to be ADMIN. A valid token without the role is still forbidden.
pub struct AdminUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;

        let user = User::find_by_id(&state.db, user_id)
            .await
            .map_err(ApiError::Internal)?;

        match user {
            Some(u) if u.is_admin() => Ok(AdminUser(user_id)),
            _ => Err(ApiError::Forbidden("Admin access required")),
        }
    }
}
