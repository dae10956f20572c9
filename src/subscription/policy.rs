use serde::{Serialize, Serializer};
use time::{OffsetDateTime, Time};

use crate::auth::repo::{SubscriptionStatus, SubscriptionTier, User};
use crate::error::ApiError;

/// Effective subscription parameters for a user record. Unset tier defaults to
/// free and unset status to active; every call site reads the defaults from
/// here so the policy cannot drift between the gate and the info endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveSubscription {
    pub tier: SubscriptionTier,
    pub status: SubscriptionStatus,
}

pub fn effective(user: &User) -> EffectiveSubscription {
    EffectiveSubscription {
        tier: user.subscription_tier.unwrap_or(SubscriptionTier::Free),
        status: user.subscription_status.unwrap_or(SubscriptionStatus::Active),
    }
}

/// A posting limit: a hard count or unlimited. Serializes as the number or the
/// string "unlimited", matching the public subscription-info shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Count(i64),
    Unlimited,
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Count(n) => serializer.serialize_i64(*n),
            Self::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

/// Per-tier caps: lifetime total and per-calendar-month.
pub fn limits(tier: SubscriptionTier) -> (Limit, Limit) {
    match tier {
        SubscriptionTier::Free => (Limit::Count(1), Limit::Count(1)),
        SubscriptionTier::Monthly => (Limit::Unlimited, Limit::Count(5)),
        SubscriptionTier::Annual => (Limit::Unlimited, Limit::Unlimited),
    }
}

/// The effective limit a posting attempt is judged against.
pub fn posting_limit(tier: SubscriptionTier) -> Limit {
    match tier {
        SubscriptionTier::Free => Limit::Count(1),
        SubscriptionTier::Monthly => Limit::Count(5),
        SubscriptionTier::Annual => Limit::Unlimited,
    }
}

/// Tier quota decision: free allows at most 1 listing ever, monthly allows 5
/// per calendar month, annual is unbounded.
pub fn evaluate(
    sub: EffectiveSubscription,
    total_projects: i64,
    projects_this_month: i64,
) -> Result<(), ApiError> {
    if sub.status != SubscriptionStatus::Active {
        return Err(ApiError::SubscriptionInactive);
    }
    match sub.tier {
        SubscriptionTier::Free if total_projects >= 1 => Err(ApiError::QuotaExceeded {
            tier: "free",
            limit: 1,
            current: total_projects,
        }),
        SubscriptionTier::Monthly if projects_this_month >= 5 => Err(ApiError::QuotaExceeded {
            tier: "monthly",
            limit: 5,
            current: projects_this_month,
        }),
        _ => Ok(()),
    }
}

/// First instant of the calendar month containing `now`. The boundary keeps
/// the offset of `now`; callers pass UTC, so the quota month rolls over at
/// UTC midnight rather than server-local midnight.
pub fn month_start(now: OffsetDateTime) -> OffsetDateTime {
    now.replace_time(Time::MIDNIGHT)
        .replace_day(1)
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn active(tier: SubscriptionTier) -> EffectiveSubscription {
        EffectiveSubscription {
            tier,
            status: SubscriptionStatus::Active,
        }
    }

    #[test]
    fn free_tier_allows_exactly_one_listing() {
        assert!(evaluate(active(SubscriptionTier::Free), 0, 0).is_ok());
        let err = evaluate(active(SubscriptionTier::Free), 1, 0).unwrap_err();
        match err {
            ApiError::QuotaExceeded {
                tier,
                limit,
                current,
            } => {
                assert_eq!(tier, "free");
                assert_eq!(limit, 1);
                assert_eq!(current, 1);
            }
            other => panic!("expected QuotaExceeded, got {other:?}"),
        }
    }

    #[test]
    fn monthly_tier_caps_at_five_per_month() {
        assert!(evaluate(active(SubscriptionTier::Monthly), 40, 4).is_ok());
        let err = evaluate(active(SubscriptionTier::Monthly), 40, 5).unwrap_err();
        match err {
            ApiError::QuotaExceeded {
                tier,
                limit,
                current,
            } => {
                assert_eq!(tier, "monthly");
                assert_eq!(limit, 5);
                assert_eq!(current, 5);
            }
            other => panic!("expected QuotaExceeded, got {other:?}"),
        }
    }

    #[test]
    fn monthly_tier_ignores_prior_month_listings() {
        // 100 listings all-time but only 3 this month: still allowed.
        assert!(evaluate(active(SubscriptionTier::Monthly), 100, 3).is_ok());
    }

    #[test]
    fn annual_tier_is_unlimited() {
        assert!(evaluate(active(SubscriptionTier::Annual), 10_000, 500).is_ok());
    }

    #[test]
    fn inactive_status_rejects_before_any_quota_check() {
        for status in [SubscriptionStatus::Cancelled, SubscriptionStatus::Expired] {
            let sub = EffectiveSubscription {
                tier: SubscriptionTier::Annual,
                status,
            };
            assert!(matches!(
                evaluate(sub, 0, 0),
                Err(ApiError::SubscriptionInactive)
            ));
        }
    }

    #[test]
    fn unset_fields_default_to_free_active() {
        let mut user = test_user();
        user.subscription_tier = None;
        user.subscription_status = None;
        let sub = effective(&user);
        assert_eq!(sub.tier, SubscriptionTier::Free);
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[test]
    fn month_start_is_first_midnight() {
        let now = datetime!(2026-08-27 15:42:03 UTC);
        assert_eq!(month_start(now), datetime!(2026-08-01 00:00:00 UTC));
        let now = datetime!(2026-02-01 00:00:00 UTC);
        assert_eq!(month_start(now), now);
    }

    #[test]
    fn limit_serialization() {
        assert_eq!(serde_json::to_value(Limit::Count(5)).unwrap(), 5);
        assert_eq!(
            serde_json::to_value(Limit::Unlimited).unwrap(),
            "unlimited"
        );
    }

    fn test_user() -> User {
        use crate::auth::repo::Role;
        use uuid::Uuid;
        User {
            id: Uuid::new_v4(),
            email: "c@example.com".into(),
            password_hash: "hash".into(),
            name: "C".into(),
            role: Role::Client,
            company: None,
            location: None,
            bio: None,
            is_active: true,
            is_verified: false,
            last_login_at: None,
            subscription_tier: None,
            subscription_status: None,
            subscription_start: None,
            subscription_end: None,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }
}
