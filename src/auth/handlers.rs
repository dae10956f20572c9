use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::Json;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::auth::dto::{
    AuthData, LoginRequest, RefreshRequest, RegisterRequest, UpdateProfileRequest,
};
use crate::auth::extractors::AuthUser;
use crate::auth::jwt::{JwtKeys, TokenPair};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::{Role, User};
use crate::envelope::{ApiResponse, AppJson};
use crate::error::ApiError;
use crate::state::AppState;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthData>>), ApiError> {
    let (Some(email), Some(password), Some(name)) = (payload.email, payload.password, payload.name)
    else {
        return Err(ApiError::Validation(
            "Email, password and name are required".into(),
        ));
    };
    let email = email.trim().to_lowercase();

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }

    // Admin accounts come from provisioning, never from self-service signup.
    let role = payload.role.unwrap_or(Role::Professional);
    if role == Role::Admin {
        return Err(ApiError::Validation("Invalid role".into()));
    }

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&password)?;
    let user = match User::create(
        &state.db,
        &email,
        &hash,
        &name,
        role,
        payload.company.as_deref(),
        payload.location.as_deref(),
    )
    .await
    {
        Ok(u) => u,
        // Concurrent registration can still trip the unique index.
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::Conflict("Email already registered".into()));
        }
        Err(e) => return Err(ApiError::Internal(e)),
    };

    let keys = JwtKeys::from_ref(&state);
    let tokens = keys.issue_pair(user.id, &user.email, user.role)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            AuthData { user, tokens },
            "Registration successful",
        )),
    ))
}

fn is_unique_violation(e: &anyhow::Error) -> bool {
    e.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<ApiResponse<AuthData>>, ApiError> {
    let (Some(email), Some(password)) = (payload.email, payload.password) else {
        return Err(ApiError::Validation("Email and password are required".into()));
    };
    let email = email.trim().to_lowercase();

    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(ApiError::Unauthenticated("Invalid credentials".into()));
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthenticated("Invalid credentials".into()));
    }

    User::touch_last_login(&state.db, user.id).await?;

    let keys = JwtKeys::from_ref(&state);
    let tokens = keys.issue_pair(user.id, &user.email, user.role)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(ApiResponse::with_message(
        AuthData { user, tokens },
        "Login successful",
    )))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> Result<Json<ApiResponse<TokenPair>>, ApiError> {
    let Some(token) = payload.refresh_token else {
        return Err(ApiError::Validation("Refresh token required".into()));
    };

    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&token)
        .map_err(|_| ApiError::Unauthenticated("Invalid refresh token".into()))?;

    let user = User::find_by_id(&state.db, claims.sub).await?;
    let user = match user {
        Some(u) if u.is_active => u,
        _ => return Err(ApiError::Unauthenticated("Invalid refresh token".into())),
    };

    let tokens = keys.issue_pair(user.id, &user.email, user.role)?;
    Ok(Json(ApiResponse::data(tokens)))
}

#[instrument(skip(user))]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<ApiResponse<User>> {
    Json(ApiResponse::data(user))
}

#[instrument(skip(state, user, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let updated = User::update_profile(
        &state.db,
        user.id,
        payload.name.as_deref(),
        payload.company.as_deref(),
        payload.location.as_deref(),
        payload.bio.as_deref(),
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(ApiResponse::with_message(updated, "Profile updated")))
}

#[instrument(skip(_user))]
pub async fn logout(AuthUser(_user): AuthUser) -> Json<ApiResponse<()>> {
    // Stateless tokens; logout is an acknowledgment only.
    Json(ApiResponse::message("Logged out successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.io"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@mail.com"));
    }

    #[test]
    fn register_request_tolerates_missing_fields() {
        let req: RegisterRequest = serde_json::from_str("{}").unwrap();
        assert!(req.email.is_none());
        assert!(req.password.is_none());
        assert!(req.name.is_none());
    }

    #[test]
    fn register_request_rejects_unknown_role() {
        let body = r#"{"email":"a@b.co","password":"longenough","name":"A","role":"superuser"}"#;
        assert!(serde_json::from_str::<RegisterRequest>(body).is_err());
    }

    #[test]
    fn refresh_request_uses_camel_case_key() {
        let req: RefreshRequest = serde_json::from_str(r#"{"refreshToken":"abc"}"#).unwrap();
        assert_eq!(req.refresh_token.as_deref(), Some("abc"));
    }

    fn register_payload(password: &str) -> RegisterRequest {
        RegisterRequest {
            email: Some("client@example.com".into()),
            password: Some(password.into()),
            name: Some("Client".into()),
            role: None,
            company: None,
            location: None,
        }
    }

    // Validation runs before any query, so a lazy pool never connects.
    #[tokio::test]
    async fn register_rejects_short_password() {
        let state = AppState::fake();
        let err = register(State(state), AppJson(register_payload("short")))
            .await
            .unwrap_err();
        match err {
            ApiError::Validation(msg) => assert!(msg.contains("at least 8")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_rejects_missing_fields() {
        let state = AppState::fake();
        let payload = RegisterRequest {
            email: None,
            password: None,
            name: None,
            role: None,
            company: None,
            location: None,
        };
        let err = register(State(state), AppJson(payload)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn register_rejects_admin_role() {
        let state = AppState::fake();
        let mut payload = register_payload("longenough");
        payload.role = Some(Role::Admin);
        let err = register(State(state), AppJson(payload)).await.unwrap_err();
        match err {
            ApiError::Validation(msg) => assert_eq!(msg, "Invalid role"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }
}
