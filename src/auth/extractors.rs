use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use tracing::warn;

use crate::auth::jwt::{Claims, JwtKeys};
use crate::auth::repo::{Role, User};
use crate::error::ApiError;
use crate::state::AppState;

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Authentication gate: verifies the bearer access token and resolves it to a
/// live, active user record. Deactivated accounts are rejected even while
/// their tokens are still cryptographically valid.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthenticated("No token provided".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify_access(token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::Unauthenticated("Invalid token".into())
        })?;

        let user = User::find_by_id(&state.db, claims.sub)
            .await
            .map_err(ApiError::Internal)?;

        match user {
            Some(u) if u.is_active => Ok(AuthUser(u)),
            _ => Err(ApiError::Unauthenticated(
                "User not found or inactive".into(),
            )),
        }
    }
}

/// Optional variant of the authentication gate: resolves identity when a valid
/// token is present and proceeds anonymously otherwise. Never rejects and does
/// not touch the database.
pub struct MaybeAuthUser(pub Option<Claims>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_token(parts)
            .and_then(|token| JwtKeys::from_ref(state).verify_access(token).ok());
        Ok(MaybeAuthUser(claims))
    }
}

/// Authorization gate layered on [`AuthUser`]: admits only the admin role.
/// Runs the authentication gate first, so an unresolved identity fails closed
/// with 401 before the role check is reached.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(ApiError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser(user))
    }
}
