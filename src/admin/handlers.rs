use axum::extract::{Path, Query, State};
use axum::Json;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::admin::dto::{
    AdminStats, ListProjectsQuery, ListUsersQuery, ProjectStats, SearchQuery, SearchResults,
    UpdateProjectRequest, UpdateUserRequest, UserDetails, UserStats,
};
use crate::auth::extractors::AdminUser;
use crate::auth::repo::{Role, User};
use crate::envelope::{ApiResponse, AppJson, PageParams, Pagination};
use crate::error::ApiError;
use crate::rfps::repo::{ListFilter, Rfp, RfpStatus};
use crate::state::AppState;

#[instrument(skip(state, _admin))]
pub async fn stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<AdminStats>>, ApiError> {
    let db = &state.db;
    let thirty_days_ago = OffsetDateTime::now_utc() - Duration::days(30);

    let users = UserStats {
        total: sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(db)
            .await?,
        active: sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active")
            .fetch_one(db)
            .await?,
        clients: count_users_by_role(db, Role::Client).await?,
        professionals: count_users_by_role(db, Role::Professional).await?,
        new_last_30_days: sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE created_at >= $1")
            .bind(thirty_days_ago)
            .fetch_one(db)
            .await?,
    };

    let projects = ProjectStats {
        total: sqlx::query_scalar("SELECT COUNT(*) FROM rfps")
            .fetch_one(db)
            .await?,
        open: count_rfps_by_status(db, RfpStatus::Open).await?,
        draft: count_rfps_by_status(db, RfpStatus::Draft).await?,
        new_last_30_days: sqlx::query_scalar("SELECT COUNT(*) FROM rfps WHERE created_at >= $1")
            .bind(thirty_days_ago)
            .fetch_one(db)
            .await?,
    };

    Ok(Json(ApiResponse::data(AdminStats { users, projects })))
}

async fn count_users_by_role(db: &sqlx::PgPool, role: Role) -> Result<i64, ApiError> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1 AND is_active")
            .bind(role)
            .fetch_one(db)
            .await?,
    )
}

async fn count_rfps_by_status(db: &sqlx::PgPool, status: RfpStatus) -> Result<i64, ApiError> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM rfps WHERE status = $1")
            .bind(status)
            .fetch_one(db)
            .await?,
    )
}

#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    let params = PageParams {
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(20),
    };
    let (page, limit) = params.normalized();

    const WHERE: &str = r#"
        ($1::text IS NULL OR name ILIKE '%' || $1 || '%' OR email ILIKE '%' || $1 || '%')
        AND ($2::user_role IS NULL OR role = $2)
        AND ($3::bool IS NULL OR is_active = $3)
    "#;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {WHERE}"))
        .bind(query.search.as_deref())
        .bind(query.role)
        .bind(query.is_active)
        .fetch_one(&state.db)
        .await?;

    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT * FROM users WHERE {WHERE} ORDER BY created_at DESC LIMIT $4 OFFSET $5"
    ))
    .bind(query.search.as_deref())
    .bind(query.role)
    .bind(query.is_active)
    .bind(limit)
    .bind(params.offset())
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::paginated(
        users,
        Pagination::new(page, limit, total),
    )))
}

#[instrument(skip(state, _admin))]
pub async fn user_details(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserDetails>>, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    let total_projects = Rfp::count_by_client(&state.db, id).await?;
    Ok(Json(ApiResponse::data(UserDetails {
        user,
        total_projects,
    })))
}

#[instrument(skip(state, _admin, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET name = COALESCE($2, name),
            role = COALESCE($3, role),
            is_active = COALESCE($4, is_active),
            is_verified = COALESCE($5, is_verified),
            subscription_tier = COALESCE($6, subscription_tier),
            subscription_status = COALESCE($7, subscription_status),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.name)
    .bind(payload.role)
    .bind(payload.is_active)
    .bind(payload.is_verified)
    .bind(payload.subscription_tier)
    .bind(payload.subscription_status)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = %id, "user updated by admin");
    Ok(Json(ApiResponse::with_message(user, "User updated")))
}

#[instrument(skip(state, admin))]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    if admin.0.id == id {
        return Err(ApiError::Validation("Cannot delete your own account".into()));
    }

    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    // Restrict policy: listings must be removed (or reassigned) first.
    let owned = Rfp::count_by_client(&state.db, id).await?;
    if owned > 0 {
        warn!(user_id = %id, owned, "delete blocked by owned listings");
        return Err(ApiError::Conflict(
            "User still owns project listings; delete those first".into(),
        ));
    }

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user.id)
        .execute(&state.db)
        .await?;

    info!(user_id = %id, "user deleted by admin");
    Ok(Json(ApiResponse::message("User deleted")))
}

#[instrument(skip(state, _admin))]
pub async fn list_projects(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ListProjectsQuery>,
) -> Result<Json<ApiResponse<Vec<Rfp>>>, ApiError> {
    let params = PageParams {
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(20),
    };
    let (page, limit) = params.normalized();

    let filter = ListFilter {
        status: query.status,
        ..Default::default()
    };
    let (rows, total) = Rfp::list(&state.db, &filter, limit, params.offset()).await?;

    Ok(Json(ApiResponse::paginated(
        rows,
        Pagination::new(page, limit, total),
    )))
}

#[instrument(skip(state, _admin, payload))]
pub async fn update_project(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateProjectRequest>,
) -> Result<Json<ApiResponse<Rfp>>, ApiError> {
    let rfp = sqlx::query_as::<_, Rfp>(
        r#"
        UPDATE rfps
        SET status = COALESCE($2, status),
            featured = COALESCE($3, featured),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.status)
    .bind(payload.featured)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("RFP not found".into()))?;

    info!(rfp_id = %id, "project updated by admin");
    Ok(Json(ApiResponse::with_message(rfp, "Project updated")))
}

#[instrument(skip(state, _admin))]
pub async fn delete_project(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    if !Rfp::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("RFP not found".into()));
    }
    info!(rfp_id = %id, "project deleted by admin");
    Ok(Json(ApiResponse::message("Project deleted")))
}

#[instrument(skip(state, _admin))]
pub async fn global_search(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<SearchResults>>, ApiError> {
    let q = query.q.unwrap_or_default();
    // Character count, not byte length; "é" alone is still too short.
    if q.chars().count() < 2 {
        return Ok(Json(ApiResponse::with_message(
            SearchResults {
                users: vec![],
                projects: vec![],
            },
            "Query too short",
        )));
    }

    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE name ILIKE '%' || $1 || '%' OR email ILIKE '%' || $1 || '%'
        ORDER BY created_at DESC
        LIMIT 20
        "#,
    )
    .bind(&q)
    .fetch_all(&state.db)
    .await?;

    let projects = sqlx::query_as::<_, Rfp>(
        r#"
        SELECT * FROM rfps
        WHERE title ILIKE '%' || $1 || '%' OR description ILIKE '%' || $1 || '%'
        ORDER BY created_at DESC
        LIMIT 20
        "#,
    )
    .bind(&q)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::data(SearchResults { users, projects })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::extractors::AdminUser;
    use crate::auth::repo::Role;
    use crate::state::AppState;

    fn admin(id: Uuid) -> AdminUser {
        AdminUser(User {
            id,
            email: "admin@example.com".into(),
            password_hash: "hash".into(),
            name: "Administrator".into(),
            role: Role::Admin,
            company: None,
            location: None,
            bio: None,
            is_active: true,
            is_verified: true,
            last_login_at: None,
            subscription_tier: None,
            subscription_status: None,
            subscription_start: None,
            subscription_end: None,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        })
    }

    // The guard fires before any query, so a lazy pool never connects.
    #[tokio::test]
    async fn admin_cannot_delete_own_account() {
        let state = AppState::fake();
        let id = Uuid::new_v4();
        let err = delete_user(State(state), admin(id), Path(id))
            .await
            .unwrap_err();
        match err {
            ApiError::Validation(msg) => assert_eq!(msg, "Cannot delete your own account"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn search_minimum_counts_characters_not_bytes() {
        let state = AppState::fake();
        let res = global_search(
            State(state),
            admin(Uuid::new_v4()),
            Query(SearchQuery { q: Some("é".into()) }),
        )
        .await
        .unwrap();
        assert_eq!(res.0.message.as_deref(), Some("Query too short"));
        assert!(res.0.data.as_ref().unwrap().users.is_empty());
    }
}
