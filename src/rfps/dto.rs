use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::rfps::repo::{ClientSummary, PrivacyLevel, Rfp, RfpPatch, RfpStatus};
use crate::subscription::gate::UsageStats;

#[derive(Debug, Deserialize)]
pub struct CreateRfpRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub industry: Option<Vec<String>>,
    pub project_type: Option<String>,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub currency: Option<String>,
    pub location: Option<serde_json::Value>,
    pub timeline: Option<serde_json::Value>,
    pub deliverables: Option<Vec<String>>,
    pub attachments: Option<serde_json::Value>,
    pub privacy_level: Option<PrivacyLevel>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub proposal_deadline: Option<OffsetDateTime>,
    pub status: Option<RfpStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRfpRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub industry: Option<Vec<String>>,
    pub project_type: Option<String>,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub currency: Option<String>,
    pub location: Option<serde_json::Value>,
    pub timeline: Option<serde_json::Value>,
    pub deliverables: Option<Vec<String>>,
    pub attachments: Option<serde_json::Value>,
    pub privacy_level: Option<PrivacyLevel>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub proposal_deadline: Option<OffsetDateTime>,
    pub status: Option<RfpStatus>,
}

impl From<UpdateRfpRequest> for RfpPatch {
    fn from(r: UpdateRfpRequest) -> Self {
        Self {
            title: r.title,
            description: r.description,
            industry: r.industry,
            project_type: r.project_type,
            budget_min: r.budget_min,
            budget_max: r.budget_max,
            currency: r.currency,
            location: r.location,
            timeline: r.timeline,
            deliverables: r.deliverables,
            attachments: r.attachments,
            privacy_level: r.privacy_level,
            proposal_deadline: r.proposal_deadline,
            status: r.status,
        }
    }
}

/// Query parameters for GET /rfps. Paging fields are inlined because the
/// query-string deserializer does not support flattened structs.
#[derive(Debug, Deserialize)]
pub struct ListRfpsQuery {
    pub status: Option<RfpStatus>,
    pub project_type: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MyRfpsQuery {
    pub status: Option<RfpStatus>,
}

#[derive(Debug, Serialize)]
pub struct RfpWithClient {
    #[serde(flatten)]
    pub rfp: Rfp,
    pub client: Option<ClientSummary>,
}

/// Create response: the new listing plus the usage snapshot the gate computed.
#[derive(Debug, Serialize)]
pub struct CreatedRfp {
    #[serde(flatten)]
    pub rfp: RfpWithClient,
    pub usage: UsageStats,
}
