use serde::Serialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::auth::repo::{SubscriptionTier, User};
use crate::error::ApiError;
use crate::rfps::repo::Rfp;
use crate::subscription::policy::{self, Limit};

/// Usage snapshot computed by the posting gate, surfaced by the create
/// handler alongside the new listing.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub tier: SubscriptionTier,
    pub total_projects: i64,
    pub projects_this_month: i64,
    pub limit: Limit,
}

/// Subscription gate for listing creation. Counts are recomputed per request
/// rather than cached; the check and the subsequent insert are separate
/// statements, so a concurrent pair of requests can each pass before either
/// commits.
pub async fn check_can_post(db: &PgPool, user_id: Uuid) -> Result<UsageStats, ApiError> {
    let user = User::find_by_id(db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let sub = policy::effective(&user);

    let total_projects = Rfp::count_by_client(db, user_id).await?;
    let month_start = policy::month_start(OffsetDateTime::now_utc());
    let projects_this_month = Rfp::count_by_client_since(db, user_id, month_start).await?;

    policy::evaluate(sub, total_projects, projects_this_month)?;

    debug!(
        user_id = %user_id,
        tier = sub.tier.as_str(),
        total_projects,
        projects_this_month,
        "posting allowed"
    );

    Ok(UsageStats {
        tier: sub.tier,
        total_projects,
        projects_this_month,
        limit: policy::posting_limit(sub.tier),
    })
}
