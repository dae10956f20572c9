use serde::{Deserialize, Serialize};

use crate::auth::repo::{Role, SubscriptionStatus, SubscriptionTier, User};
use crate::rfps::repo::{Rfp, RfpStatus};

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub search: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
    pub subscription_tier: Option<SubscriptionTier>,
    pub subscription_status: Option<SubscriptionStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ListProjectsQuery {
    pub status: Option<RfpStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub status: Option<RfpStatus>,
    pub featured: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total: i64,
    pub active: i64,
    pub clients: i64,
    pub professionals: i64,
    pub new_last_30_days: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub total: i64,
    pub open: i64,
    pub draft: i64,
    pub new_last_30_days: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub users: UserStats,
    pub projects: ProjectStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    #[serde(flatten)]
    pub user: User,
    pub total_projects: i64,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub users: Vec<User>,
    pub projects: Vec<Rfp>,
}
