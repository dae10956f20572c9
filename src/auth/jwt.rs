use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::auth::repo::Role;
use crate::config::JwtConfig;
use crate::state::AppState;

/// JWT payload carried by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

/// Access/refresh token pair returned by register, login and refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signing and verification material for both token kinds. Access and refresh
/// tokens use distinct secrets, so one never verifies under the other's key.
#[derive(Clone)]
pub struct JwtKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(cfg.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(cfg.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(cfg.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(cfg.refresh_secret.as_bytes()),
            access_ttl: Duration::from_secs(cfg.access_ttl_days as u64 * 24 * 3600),
            refresh_ttl: Duration::from_secs(cfg.refresh_ttl_days as u64 * 24 * 3600),
        }
    }

    fn sign(&self, user_id: Uuid, email: &str, role: Role, key: &EncodingKey, ttl: Duration) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, key)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: Uuid, email: &str, role: Role) -> anyhow::Result<String> {
        self.sign(user_id, email, role, &self.access_encoding, self.access_ttl)
    }

    pub fn sign_refresh(&self, user_id: Uuid, email: &str, role: Role) -> anyhow::Result<String> {
        self.sign(user_id, email, role, &self.refresh_encoding, self.refresh_ttl)
    }

    pub fn issue_pair(&self, user_id: Uuid, email: &str, role: Role) -> anyhow::Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.sign_access(user_id, email, role)?,
            refresh_token: self.sign_refresh(user_id, email, role)?,
        })
    }

    pub fn verify_access(&self, token: &str) -> anyhow::Result<Claims> {
        let data = decode::<Claims>(token, &self.access_decoding, &Validation::default())?;
        Ok(data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        let data = decode::<Claims>(token, &self.refresh_decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;

    fn make_keys() -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            access_secret: "test-access-secret".into(),
            refresh_secret: "test-refresh-secret".into(),
            access_ttl_days: 7,
            refresh_ttl_days: 30,
        })
    }

    #[test]
    fn sign_and_verify_access_token() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys
            .sign_access(user_id, "a@b.co", Role::Client)
            .expect("sign access");
        let claims = keys.verify_access(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@b.co");
        assert_eq!(claims.role, Role::Client);
    }

    #[test]
    fn access_token_fails_under_refresh_secret() {
        let keys = make_keys();
        let token = keys
            .sign_access(Uuid::new_v4(), "a@b.co", Role::Client)
            .expect("sign access");
        assert!(keys.verify_refresh(&token).is_err());
    }

    #[test]
    fn refresh_token_fails_under_access_secret() {
        let keys = make_keys();
        let token = keys
            .sign_refresh(Uuid::new_v4(), "a@b.co", Role::Professional)
            .expect("sign refresh");
        assert!(keys.verify_access(&token).is_err());
        let claims = keys.verify_refresh(&token).expect("verify refresh");
        assert_eq!(claims.role, Role::Professional);
    }

    #[test]
    fn garbage_token_is_rejected() {
        let keys = make_keys();
        assert!(keys.verify_access("not.a.jwt").is_err());
    }

    #[test]
    fn token_pair_serializes_camel_case() {
        let keys = make_keys();
        let pair = keys
            .issue_pair(Uuid::new_v4(), "a@b.co", Role::Client)
            .expect("issue pair");
        let json = serde_json::to_value(&pair).unwrap();
        assert!(json.get("accessToken").is_some());
        assert!(json.get("refreshToken").is_some());
    }
}
