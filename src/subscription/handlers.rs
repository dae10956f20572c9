use axum::extract::State;
use axum::Json;
use time::util::days_in_year_month;
use time::{Date, Month, OffsetDateTime};
use tracing::{info, instrument};

use crate::auth::extractors::AuthUser;
use crate::auth::repo::{SubscriptionStatus, SubscriptionTier, User};
use crate::envelope::{ApiResponse, AppJson};
use crate::error::ApiError;
use crate::rfps::repo::Rfp;
use crate::state::AppState;
use crate::subscription::dto::{
    CheckoutData, CheckoutRequest, Price, SubscriptionInfo, TierLimits, UpgradeRequest, UsageInfo,
};
use crate::subscription::policy;

#[instrument(skip(state, user))]
pub async fn subscription_info(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<SubscriptionInfo>>, ApiError> {
    let sub = policy::effective(&user);

    let total_projects = Rfp::count_by_client(&state.db, user.id).await?;
    let month_start = policy::month_start(OffsetDateTime::now_utc());
    let projects_this_month = Rfp::count_by_client_since(&state.db, user.id, month_start).await?;

    let (total, monthly) = policy::limits(sub.tier);
    let can_post = policy::evaluate(sub, total_projects, projects_this_month).is_ok();

    Ok(Json(ApiResponse::data(SubscriptionInfo {
        tier: sub.tier,
        status: sub.status,
        subscription_start: user.subscription_start,
        subscription_end: user.subscription_end,
        stripe_customer_id: user.stripe_customer_id,
        usage: UsageInfo {
            total_projects,
            projects_this_month,
            limits: TierLimits { total, monthly },
        },
        can_post,
    })))
}

fn paid_tier(tier: Option<SubscriptionTier>) -> Result<SubscriptionTier, ApiError> {
    match tier {
        Some(t @ (SubscriptionTier::Monthly | SubscriptionTier::Annual)) => Ok(t),
        _ => Err(ApiError::Validation("Invalid subscription tier".into())),
    }
}

/// Payment-provider checkout is stubbed: returns the price table entry and a
/// placeholder checkout url.
#[instrument(skip(_user, payload))]
pub async fn create_checkout(
    AuthUser(_user): AuthUser,
    AppJson(payload): AppJson<CheckoutRequest>,
) -> Result<Json<ApiResponse<CheckoutData>>, ApiError> {
    let tier = paid_tier(payload.tier)?;
    let price = match tier {
        SubscriptionTier::Monthly => Price {
            amount: 2900,
            interval: "month",
        },
        _ => Price {
            amount: 19900,
            interval: "year",
        },
    };

    Ok(Json(ApiResponse::with_message(
        CheckoutData {
            checkout_url: format!("/checkout/{}", tier.as_str()),
            price,
            tier,
        },
        "Payment integration pending. Manual upgrade available.",
    )))
}

#[instrument(skip(state, user, payload))]
pub async fn upgrade(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<UpgradeRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let tier = paid_tier(payload.tier)?;

    let now = OffsetDateTime::now_utc();
    let end = match tier {
        SubscriptionTier::Monthly => add_months(now, 1),
        _ => add_months(now, 12),
    };

    let updated = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET subscription_tier = $2,
            subscription_status = $3,
            subscription_start = $4,
            subscription_end = $5,
            stripe_customer_id = COALESCE($6, stripe_customer_id),
            stripe_subscription_id = COALESCE($7, stripe_subscription_id),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(tier)
    .bind(SubscriptionStatus::Active)
    .bind(now)
    .bind(end)
    .bind(payload.stripe_customer_id)
    .bind(payload.stripe_subscription_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = %user.id, tier = tier.as_str(), "subscription upgraded");
    Ok(Json(ApiResponse::with_message(
        serde_json::json!({
            "tier": updated.subscription_tier,
            "status": updated.subscription_status,
            "subscription_end": updated.subscription_end.map(|t| t.to_string()),
        }),
        format!("Successfully upgraded to {} plan!", tier.as_str()),
    )))
}

#[instrument(skip(state, user))]
pub async fn cancel(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    // Tier stays in place until the paid-through date; only the status flips.
    let updated = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET subscription_status = $2, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(SubscriptionStatus::Cancelled)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = %user.id, "subscription cancelled");
    let message = match updated.subscription_end {
        Some(end) => format!(
            "Subscription cancelled. You can continue using until {}",
            end.date()
        ),
        None => "Subscription cancelled".to_string(),
    };
    Ok(Json(ApiResponse::message(message)))
}

/// Calendar-month arithmetic with the day-of-month clamped to the target
/// month's length (Jan 31 + 1 month = Feb 28/29).
fn add_months(t: OffsetDateTime, months: i32) -> OffsetDateTime {
    let date = t.date();
    let zero_based = date.year() * 12 + (date.month() as i32 - 1) + months;
    let year = zero_based.div_euclid(12);
    let month = Month::try_from((zero_based.rem_euclid(12) + 1) as u8).unwrap_or(Month::January);
    let day = date.day().min(days_in_year_month(year, month));
    Date::from_calendar_date(year, month, day)
        .map(|d| t.replace_date(d))
        .unwrap_or(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn add_one_month_simple() {
        let t = datetime!(2026-03-15 10:00:00 UTC);
        assert_eq!(add_months(t, 1), datetime!(2026-04-15 10:00:00 UTC));
    }

    #[test]
    fn add_one_month_clamps_day() {
        let t = datetime!(2026-01-31 00:00:00 UTC);
        assert_eq!(add_months(t, 1), datetime!(2026-02-28 00:00:00 UTC));
    }

    #[test]
    fn add_month_crosses_year() {
        let t = datetime!(2026-12-10 00:00:00 UTC);
        assert_eq!(add_months(t, 1), datetime!(2027-01-10 00:00:00 UTC));
    }

    #[test]
    fn add_twelve_months_handles_leap_day() {
        let t = datetime!(2028-02-29 12:00:00 UTC);
        assert_eq!(add_months(t, 12), datetime!(2029-02-28 12:00:00 UTC));
    }

    #[test]
    fn paid_tier_rejects_free_and_missing() {
        assert!(paid_tier(Some(SubscriptionTier::Free)).is_err());
        assert!(paid_tier(None).is_err());
        assert_eq!(
            paid_tier(Some(SubscriptionTier::Annual)).unwrap(),
            SubscriptionTier::Annual
        );
    }
}
