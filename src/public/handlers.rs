use axum::extract::State;
use axum::Json;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::repo::Role;
use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::rfps::dto::RfpWithClient;
use crate::rfps::repo::{ClientSummary, Rfp, RfpStatus};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_users: i64,
    pub total_professionals: i64,
    pub total_clients: i64,
    pub total_projects: i64,
    pub open_projects: i64,
    pub total_project_value: i64,
}

#[derive(Debug, Serialize)]
pub struct ProjectsByType {
    pub residential: i64,
    pub commercial: i64,
    pub interior: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivityStats {
    pub new_users_last_30_days: i64,
    pub new_projects_last_30_days: i64,
    pub growth_rate: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicStats {
    pub overview: Overview,
    pub projects_by_type: ProjectsByType,
    pub recent_activity: RecentActivityStats,
}

/// Projects created in the last 30 days versus the 30 days before that,
/// as a percentage, one decimal place. Zero when there is no prior baseline.
fn growth_rate(recent: i64, previous: i64) -> f64 {
    if previous == 0 {
        return 0.0;
    }
    let raw = (recent - previous) as f64 / previous as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}

async fn count_projects_by_type(db: &sqlx::PgPool, project_type: &str) -> Result<i64, ApiError> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM rfps WHERE project_type = $1")
            .bind(project_type)
            .fetch_one(db)
            .await?,
    )
}

#[instrument(skip(state))]
pub async fn public_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<PublicStats>>, ApiError> {
    let db = &state.db;
    let now = OffsetDateTime::now_utc();
    let thirty_days_ago = now - Duration::days(30);
    let sixty_days_ago = now - Duration::days(60);

    let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active")
        .fetch_one(db)
        .await?;
    let total_professionals: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1 AND is_active")
            .bind(Role::Professional)
            .fetch_one(db)
            .await?;
    let total_clients: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1 AND is_active")
            .bind(Role::Client)
            .fetch_one(db)
            .await?;
    let total_projects: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rfps")
        .fetch_one(db)
        .await?;
    let open_projects: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rfps WHERE status = $1")
        .bind(RfpStatus::Open)
        .fetch_one(db)
        .await?;

    // Midpoint of each budget range, summed over listings that state both ends.
    let total_value: Option<Decimal> = sqlx::query_scalar(
        r#"
        SELECT SUM((budget_min + budget_max) / 2) FROM rfps
        WHERE budget_min IS NOT NULL AND budget_max IS NOT NULL
        "#,
    )
    .fetch_one(db)
    .await?;

    let new_users: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE created_at >= $1 AND is_active")
            .bind(thirty_days_ago)
            .fetch_one(db)
            .await?;
    let new_projects: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rfps WHERE created_at >= $1")
        .bind(thirty_days_ago)
        .fetch_one(db)
        .await?;
    let previous_projects: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM rfps WHERE created_at >= $1 AND created_at < $2",
    )
    .bind(sixty_days_ago)
    .bind(thirty_days_ago)
    .fetch_one(db)
    .await?;

    Ok(Json(ApiResponse::data(PublicStats {
        overview: Overview {
            total_users,
            total_professionals,
            total_clients,
            total_projects,
            open_projects,
            total_project_value: total_value
                .and_then(|v| v.round().to_i64())
                .unwrap_or(0),
        },
        projects_by_type: ProjectsByType {
            residential: count_projects_by_type(db, "residential").await?,
            commercial: count_projects_by_type(db, "commercial").await?,
            interior: count_projects_by_type(db, "interior").await?,
        },
        recent_activity: RecentActivityStats {
            new_users_last_30_days: new_users,
            new_projects_last_30_days: new_projects,
            growth_rate: growth_rate(new_projects, previous_projects),
        },
    })))
}

#[instrument(skip(state))]
pub async fn featured_projects(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<RfpWithClient>>>, ApiError> {
    let mut rows = sqlx::query_as::<_, Rfp>(
        r#"
        SELECT * FROM rfps WHERE status = $1 AND featured
        ORDER BY created_at DESC LIMIT 6
        "#,
    )
    .bind(RfpStatus::Open)
    .fetch_all(&state.db)
    .await?;

    // Backfill with recent open listings when the featured set runs short.
    if rows.len() < 6 {
        let extra = sqlx::query_as::<_, Rfp>(
            r#"
            SELECT * FROM rfps WHERE status = $1 AND NOT featured
            ORDER BY created_at DESC LIMIT $2
            "#,
        )
        .bind(RfpStatus::Open)
        .bind((6 - rows.len()) as i64)
        .fetch_all(&state.db)
        .await?;
        rows.extend(extra);
    }

    let mut data = Vec::with_capacity(rows.len());
    for rfp in rows {
        let client = ClientSummary::find(&state.db, rfp.client_id).await?;
        data.push(RfpWithClient { rfp, client });
    }
    Ok(Json(ApiResponse::data(data)))
}

#[derive(Debug, Serialize)]
pub struct ActivityItem {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: Uuid,
    pub title: String,
    pub user: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[instrument(skip(state))]
pub async fn recent_activity(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ActivityItem>>>, ApiError> {
    let projects = sqlx::query_as::<_, Rfp>(
        "SELECT * FROM rfps ORDER BY created_at DESC LIMIT 10",
    )
    .fetch_all(&state.db)
    .await?;

    #[derive(sqlx::FromRow)]
    struct RecentUser {
        id: Uuid,
        name: String,
        role: Role,
        created_at: OffsetDateTime,
    }
    let users = sqlx::query_as::<_, RecentUser>(
        r#"
        SELECT id, name, role, created_at FROM users
        WHERE is_active ORDER BY created_at DESC LIMIT 10
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    let mut feed = Vec::with_capacity(projects.len() + users.len());
    for p in projects {
        let client = ClientSummary::find(&state.db, p.client_id).await?;
        feed.push(ActivityItem {
            kind: "project",
            id: p.id,
            title: p.title,
            user: client.map(|c| c.name),
            timestamp: p.created_at,
        });
    }
    for u in users {
        feed.push(ActivityItem {
            kind: "user",
            id: u.id,
            title: format!("{} joined as {}", u.name, u.role.as_str()),
            user: Some(u.name),
            timestamp: u.created_at,
        });
    }

    feed.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    feed.truncate(15);

    Ok(Json(ApiResponse::data(feed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_rate_handles_zero_baseline() {
        assert_eq!(growth_rate(10, 0), 0.0);
    }

    #[test]
    fn growth_rate_rounds_to_one_decimal() {
        assert_eq!(growth_rate(4, 3), 33.3);
        assert_eq!(growth_rate(3, 4), -25.0);
        assert_eq!(growth_rate(8, 4), 100.0);
    }

    #[test]
    fn activity_item_serializes_type_key() {
        let item = ActivityItem {
            kind: "project",
            id: Uuid::new_v4(),
            title: "Loft renovation".into(),
            user: Some("Ada".into()),
            timestamp: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "project");
    }
}
