use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::auth::extractors::AdminUser;
use crate::auth::repo::Role;
use crate::envelope::{ApiResponse, AppJson};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientFilter {
    All,
    Clients,
    Professionals,
}

impl RecipientFilter {
    fn role(self) -> Option<Role> {
        match self {
            Self::All => None,
            Self::Clients => Some(Role::Client),
            Self::Professionals => Some(Role::Professional),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkEmailRequest {
    pub subject: Option<String>,
    pub message: Option<String>,
    pub recipients: Option<RecipientFilter>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Recipient {
    pub email: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEmailDraft {
    pub recipient_count: usize,
    pub recipients: Vec<Recipient>,
    pub subject: String,
    pub message: String,
    pub status: &'static str,
}

/// Drafts the recipient list only; delivery integration is out of scope, so
/// nothing is dispatched.
#[instrument(skip(state, _admin, payload))]
pub async fn bulk_email(
    State(state): State<AppState>,
    _admin: AdminUser,
    AppJson(payload): AppJson<BulkEmailRequest>,
) -> Result<Json<ApiResponse<BulkEmailDraft>>, ApiError> {
    let (Some(subject), Some(message)) = (payload.subject, payload.message) else {
        return Err(ApiError::Validation("Subject and message are required".into()));
    };

    let filter = payload.recipients.unwrap_or(RecipientFilter::All);
    let recipients = sqlx::query_as::<_, Recipient>(
        r#"
        SELECT email, name, role FROM users
        WHERE is_active AND ($1::user_role IS NULL OR role = $1)
        ORDER BY created_at
        "#,
    )
    .bind(filter.role())
    .fetch_all(&state.db)
    .await?;

    info!(count = recipients.len(), "bulk email drafted");
    let count = recipients.len();
    Ok(Json(ApiResponse::with_message(
        BulkEmailDraft {
            recipient_count: count,
            recipients,
            subject,
            message,
            status: "Ready to send (email service integration pending)",
        },
        format!("Email prepared for {count} users"),
    )))
}

#[derive(Debug, Serialize)]
pub struct EmailTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub subject: &'static str,
    pub body: &'static str,
}

fn template_set() -> Vec<EmailTemplate> {
    vec![
        EmailTemplate {
            id: "welcome",
            name: "Welcome Message",
            subject: "Welcome to BuildConnect!",
            body: "Hi {{name}},\n\nWelcome to BuildConnect - the architecture marketplace.\n\nGet started by completing your profile, browsing open projects, or posting your first RFP.\n\nBest regards,\nThe BuildConnect Team",
        },
        EmailTemplate {
            id: "announcement",
            name: "Platform Announcement",
            subject: "Important Update from BuildConnect",
            body: "Hi {{name}},\n\nWe have an important announcement to share with our community.\n\n[Your announcement here]\n\nBest regards,\nThe BuildConnect Team",
        },
        EmailTemplate {
            id: "promotion",
            name: "Upgrade Promotion",
            subject: "Limited Time Offer - Upgrade Your Plan",
            body: "Hi {{name}},\n\nFor a limited time, upgrade to our Annual plan and save.\n\nAnnual plan benefits: unlimited project posts, featured profile badge, priority support.\n\nBest regards,\nThe BuildConnect Team",
        },
        EmailTemplate {
            id: "monthly-update",
            name: "Monthly Newsletter",
            subject: "BuildConnect - Monthly Update",
            body: "Hi {{name}},\n\nHere's what's new this month at BuildConnect.\n\nThank you for being part of our community!\n\nBest regards,\nThe BuildConnect Team",
        },
    ]
}

#[instrument(skip(_admin))]
pub async fn templates(_admin: AdminUser) -> Json<ApiResponse<Vec<EmailTemplate>>> {
    Json(ApiResponse::data(template_set()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_filter_maps_to_roles() {
        assert_eq!(RecipientFilter::All.role(), None);
        assert_eq!(RecipientFilter::Clients.role(), Some(Role::Client));
        assert_eq!(
            RecipientFilter::Professionals.role(),
            Some(Role::Professional)
        );
    }

    #[test]
    fn recipient_filter_deserializes_lowercase() {
        let req: BulkEmailRequest =
            serde_json::from_str(r#"{"subject":"s","message":"m","recipients":"clients"}"#)
                .unwrap();
        assert_eq!(req.recipients, Some(RecipientFilter::Clients));
    }

    #[test]
    fn templates_carry_name_placeholder() {
        for t in template_set() {
            assert!(t.body.contains("{{name}}"), "template {} lacks placeholder", t.id);
        }
    }
}
