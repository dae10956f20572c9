use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "rfp_status", rename_all = "snake_case")]
pub enum RfpStatus {
    Draft,
    Open,
    InReview,
    Awarded,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "privacy_level", rename_all = "snake_case")]
pub enum PrivacyLevel {
    Public,
    Private,
    InviteOnly,
}

/// Project listing owned by exactly one client.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Rfp {
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub description: String,
    pub industry: Vec<String>,
    pub project_type: String,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub currency: String,
    pub location: serde_json::Value,
    pub timeline: serde_json::Value,
    pub deliverables: Vec<String>,
    pub attachments: serde_json::Value,
    pub privacy_level: PrivacyLevel,
    #[serde(with = "time::serde::rfc3339")]
    pub proposal_deadline: OffsetDateTime,
    pub status: RfpStatus,
    pub view_count: i32,
    pub featured: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Owner fields attached to listings in list/detail responses.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ClientSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub role: Role,
}

pub struct NewRfp {
    pub title: String,
    pub description: String,
    pub industry: Vec<String>,
    pub project_type: String,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub currency: String,
    pub location: serde_json::Value,
    pub timeline: serde_json::Value,
    pub deliverables: Vec<String>,
    pub attachments: serde_json::Value,
    pub privacy_level: PrivacyLevel,
    pub proposal_deadline: OffsetDateTime,
    pub status: RfpStatus,
}

#[derive(Debug, Default)]
pub struct RfpPatch {
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
    pub proposal_deadline: Option<OffsetDateTime>,
    pub status: Option<RfpStatus>,
}

#[derive(Debug, Default)]
pub struct ListFilter {
    pub status: Option<RfpStatus>,
    pub project_type: Option<String>,
    pub search: Option<String>,
}

impl Rfp {
    pub async fn create(db: &PgPool, client_id: Uuid, new: NewRfp) -> anyhow::Result<Rfp> {
        let rfp = sqlx::query_as::<_, Rfp>(
            r#"
            INSERT INTO rfps (
                client_id, title, description, industry, project_type,
                budget_min, budget_max, currency, location, timeline,
                deliverables, attachments, privacy_level, proposal_deadline, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(client_id)
        .bind(new.title)
        .bind(new.description)
        .bind(new.industry)
        .bind(new.project_type)
        .bind(new.budget_min)
        .bind(new.budget_max)
        .bind(new.currency)
        .bind(new.location)
        .bind(new.timeline)
        .bind(new.deliverables)
        .bind(new.attachments)
        .bind(new.privacy_level)
        .bind(new.proposal_deadline)
        .bind(new.status)
        .fetch_one(db)
        .await?;
        Ok(rfp)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Rfp>> {
        let rfp = sqlx::query_as::<_, Rfp>("SELECT * FROM rfps WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(rfp)
    }

    /// Fetch by id with an atomic view-count bump; one increment per read.
    pub async fn fetch_and_count_view(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Rfp>> {
        let rfp = sqlx::query_as::<_, Rfp>(
            "UPDATE rfps SET view_count = view_count + 1 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(rfp)
    }

    pub async fn list(
        db: &PgPool,
        filter: &ListFilter,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<(Vec<Rfp>, i64)> {
        const WHERE: &str = r#"
            ($1::rfp_status IS NULL OR status = $1)
            AND ($2::text IS NULL OR project_type = $2)
            AND ($3::text IS NULL OR title ILIKE '%' || $3 || '%' OR description ILIKE '%' || $3 || '%')
        "#;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM rfps WHERE {WHERE}"))
                .bind(filter.status)
                .bind(filter.project_type.as_deref())
                .bind(filter.search.as_deref())
                .fetch_one(db)
                .await?;

        let rows = sqlx::query_as::<_, Rfp>(&format!(
            "SELECT * FROM rfps WHERE {WHERE} ORDER BY created_at DESC LIMIT $4 OFFSET $5"
        ))
        .bind(filter.status)
        .bind(filter.project_type.as_deref())
        .bind(filter.search.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        Ok((rows, total))
    }

    pub async fn list_by_client(
        db: &PgPool,
        client_id: Uuid,
        status: Option<RfpStatus>,
    ) -> anyhow::Result<Vec<Rfp>> {
        let rows = sqlx::query_as::<_, Rfp>(
            r#"
            SELECT * FROM rfps
            WHERE client_id = $1 AND ($2::rfp_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(client_id)
        .bind(status)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Partial update; absent fields keep their current value. Status accepts
    /// any enum value, there is no transition table.
    pub async fn update(db: &PgPool, id: Uuid, patch: RfpPatch) -> anyhow::Result<Option<Rfp>> {
        let rfp = sqlx::query_as::<_, Rfp>(
            r#"
            UPDATE rfps
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                industry = COALESCE($4, industry),
                project_type = COALESCE($5, project_type),
                budget_min = COALESCE($6, budget_min),
                budget_max = COALESCE($7, budget_max),
                currency = COALESCE($8, currency),
                location = COALESCE($9, location),
                timeline = COALESCE($10, timeline),
                deliverables = COALESCE($11, deliverables),
                attachments = COALESCE($12, attachments),
                privacy_level = COALESCE($13, privacy_level),
                proposal_deadline = COALESCE($14, proposal_deadline),
                status = COALESCE($15, status),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.industry)
        .bind(patch.project_type)
        .bind(patch.budget_min)
        .bind(patch.budget_max)
        .bind(patch.currency)
        .bind(patch.location)
        .bind(patch.timeline)
        .bind(patch.deliverables)
        .bind(patch.attachments)
        .bind(patch.privacy_level)
        .bind(patch.proposal_deadline)
        .bind(patch.status)
        .fetch_optional(db)
        .await?;
        Ok(rfp)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM rfps WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Owner-scoped publish: draft or not, the listing goes open with a fresh
    /// published_at. Returns None when the id does not belong to the client.
    pub async fn publish(db: &PgPool, id: Uuid, client_id: Uuid) -> anyhow::Result<Option<Rfp>> {
        let rfp = sqlx::query_as::<_, Rfp>(
            r#"
            UPDATE rfps
            SET status = $3, published_at = now(), updated_at = now()
            WHERE id = $1 AND client_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(client_id)
        .bind(RfpStatus::Open)
        .fetch_optional(db)
        .await?;
        Ok(rfp)
    }

    pub async fn close(db: &PgPool, id: Uuid, client_id: Uuid) -> anyhow::Result<Option<Rfp>> {
        let rfp = sqlx::query_as::<_, Rfp>(
            r#"
            UPDATE rfps
            SET status = $3, updated_at = now()
            WHERE id = $1 AND client_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(client_id)
        .bind(RfpStatus::Cancelled)
        .fetch_optional(db)
        .await?;
        Ok(rfp)
    }

    pub async fn count_by_client(db: &PgPool, client_id: Uuid) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rfps WHERE client_id = $1")
            .bind(client_id)
            .fetch_one(db)
            .await?;
        Ok(count)
    }

    pub async fn count_by_client_since(
        db: &PgPool,
        client_id: Uuid,
        since: OffsetDateTime,
    ) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM rfps WHERE client_id = $1 AND created_at >= $2",
        )
        .bind(client_id)
        .bind(since)
        .fetch_one(db)
        .await?;
        Ok(count)
    }
}

impl ClientSummary {
    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<ClientSummary>> {
        let client = sqlx::query_as::<_, ClientSummary>(
            "SELECT id, name, email, company, role FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(client)
    }

    /// Batch lookup for list responses; one query per page instead of one per row.
    pub async fn find_many(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<ClientSummary>> {
        let clients = sqlx::query_as::<_, ClientSummary>(
            "SELECT id, name, email, company, role FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(db)
        .await?;
        Ok(clients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&RfpStatus::InReview).unwrap(),
            r#""in_review""#
        );
        assert_eq!(
            serde_json::from_str::<RfpStatus>(r#""cancelled""#).unwrap(),
            RfpStatus::Cancelled
        );
        assert_eq!(
            serde_json::to_string(&PrivacyLevel::InviteOnly).unwrap(),
            r#""invite_only""#
        );
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(serde_json::from_str::<RfpStatus>(r#""archived""#).is_err());
    }
}
