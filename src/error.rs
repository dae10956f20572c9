use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Error taxonomy shared by every handler. Each variant renders the same
/// `{success:false, error:{message, statusCode, ...}}` envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Your subscription is not active. Please renew to continue posting projects.")]
    SubscriptionInactive,
    #[error("quota exceeded for {tier} tier")]
    QuotaExceeded {
        tier: &'static str,
        limit: i64,
        current: i64,
    },
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::SubscriptionInactive | Self::QuotaExceeded { .. } => {
                StatusCode::FORBIDDEN
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> serde_json::Value {
        let status = self.status().as_u16();
        match self {
            Self::SubscriptionInactive => json!({
                "message": self.to_string(),
                "statusCode": status,
                "code": "SUBSCRIPTION_INACTIVE",
            }),
            Self::QuotaExceeded {
                tier,
                limit,
                current,
            } => {
                let message = match *tier {
                    "free" => {
                        "You have reached your free tier limit (1 project). Upgrade to post more!"
                            .to_string()
                    }
                    "monthly" => "You have reached your monthly limit (5 projects this month). Upgrade to Annual for unlimited!".to_string(),
                    other => format!("You have reached your {other} tier limit."),
                };
                json!({
                    "message": message,
                    "statusCode": status,
                    "code": "LIMIT_REACHED",
                    "tier": tier,
                    "limit": limit,
                    "current": current,
                })
            }
            // Internal detail stays in server logs only.
            Self::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                json!({
                    "message": "Internal server error",
                    "statusCode": status,
                })
            }
            other => json!({
                "message": other.to_string(),
                "statusCode": status,
            }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({ "success": false, "error": self.body() });
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound("Resource not found".into()),
            other => Self::Internal(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_exceeded_carries_machine_readable_fields() {
        let err = ApiError::QuotaExceeded {
            tier: "free",
            limit: 1,
            current: 1,
        };
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        let body = err.body();
        assert_eq!(body["code"], "LIMIT_REACHED");
        assert_eq!(body["tier"], "free");
        assert_eq!(body["limit"], 1);
        assert_eq!(body["current"], 1);
    }

    #[test]
    fn inactive_subscription_uses_distinct_code() {
        let err = ApiError::SubscriptionInactive;
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.body()["code"], "SUBSCRIPTION_INACTIVE");
    }

    #[test]
    fn internal_error_hides_detail() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3"));
        let body = err.body();
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["statusCode"], 500);
    }

    #[test]
    fn statuses_match_taxonomy() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthenticated("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
