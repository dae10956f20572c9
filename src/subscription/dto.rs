use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::repo::{SubscriptionStatus, SubscriptionTier};
use crate::subscription::policy::Limit;

#[derive(Debug, Deserialize)]
pub struct UpgradeRequest {
    pub tier: Option<SubscriptionTier>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub tier: Option<SubscriptionTier>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageInfo {
    pub total_projects: i64,
    pub projects_this_month: i64,
    pub limits: TierLimits,
}

#[derive(Debug, Serialize)]
pub struct TierLimits {
    pub total: Limit,
    pub monthly: Limit,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionInfo {
    pub tier: SubscriptionTier,
    pub status: SubscriptionStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub subscription_start: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub subscription_end: Option<OffsetDateTime>,
    pub stripe_customer_id: Option<String>,
    pub usage: UsageInfo,
    #[serde(rename = "canPost")]
    pub can_post: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutData {
    pub checkout_url: String,
    pub price: Price,
    pub tier: SubscriptionTier,
}

#[derive(Debug, Serialize)]
pub struct Price {
    pub amount: i64,
    pub interval: &'static str,
}
