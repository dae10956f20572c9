use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::extractors::{AuthUser, MaybeAuthUser};
use crate::auth::repo::Role;
use crate::envelope::{ApiResponse, AppJson, PageParams, Pagination};
use crate::error::ApiError;
use crate::rfps::dto::{
    CreateRfpRequest, CreatedRfp, ListRfpsQuery, MyRfpsQuery, RfpWithClient, UpdateRfpRequest,
};
use crate::rfps::repo::{ClientSummary, ListFilter, NewRfp, PrivacyLevel, Rfp, RfpStatus};
use crate::state::AppState;
use crate::subscription::gate::check_can_post;

async fn with_client(state: &AppState, rfp: Rfp) -> Result<RfpWithClient, ApiError> {
    let client = ClientSummary::find(&state.db, rfp.client_id).await?;
    Ok(RfpWithClient { rfp, client })
}

async fn with_clients(state: &AppState, rfps: Vec<Rfp>) -> Result<Vec<RfpWithClient>, ApiError> {
    let ids: Vec<Uuid> = rfps.iter().map(|r| r.client_id).collect();
    let clients: HashMap<Uuid, ClientSummary> = ClientSummary::find_many(&state.db, &ids)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();
    Ok(rfps
        .into_iter()
        .map(|rfp| {
            let client = clients.get(&rfp.client_id).cloned();
            RfpWithClient { rfp, client }
        })
        .collect())
}

#[instrument(skip(state, user, payload))]
pub async fn create_rfp(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<CreateRfpRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedRfp>>), ApiError> {
    // Tier quota gate runs after authentication, before any write.
    let usage = check_can_post(&state.db, user.id).await?;

    let (Some(title), Some(description), Some(project_type), Some(proposal_deadline)) = (
        payload.title,
        payload.description,
        payload.project_type,
        payload.proposal_deadline,
    ) else {
        return Err(ApiError::Validation(
            "Title, description, project_type and proposal_deadline are required".into(),
        ));
    };

    let new = NewRfp {
        title,
        description,
        industry: payload.industry.unwrap_or_default(),
        project_type,
        budget_min: payload.budget_min,
        budget_max: payload.budget_max,
        currency: payload.currency.unwrap_or_else(|| "USD".into()),
        location: payload
            .location
            .unwrap_or_else(|| serde_json::json!({ "remote": false })),
        timeline: payload.timeline.unwrap_or_else(|| serde_json::json!({})),
        deliverables: payload.deliverables.unwrap_or_default(),
        attachments: payload.attachments.unwrap_or_else(|| serde_json::json!([])),
        privacy_level: payload.privacy_level.unwrap_or(PrivacyLevel::Public),
        proposal_deadline,
        status: payload.status.unwrap_or(RfpStatus::Draft),
    };

    let rfp = Rfp::create(&state.db, user.id, new).await?;
    info!(rfp_id = %rfp.id, client_id = %user.id, "rfp created");

    let rfp = with_client(&state, rfp).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            CreatedRfp { rfp, usage },
            "RFP created successfully",
        )),
    ))
}

#[instrument(skip(state, _auth))]
pub async fn list_rfps(
    State(state): State<AppState>,
    _auth: MaybeAuthUser,
    Query(query): Query<ListRfpsQuery>,
) -> Result<Json<ApiResponse<Vec<RfpWithClient>>>, ApiError> {
    let params = PageParams {
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(20),
    };
    let (page, limit) = params.normalized();

    let filter = ListFilter {
        status: query.status,
        project_type: query.project_type,
        search: query.search,
    };

    let (rows, total) = Rfp::list(&state.db, &filter, limit, params.offset()).await?;
    let data = with_clients(&state, rows).await?;

    Ok(Json(ApiResponse::paginated(
        data,
        Pagination::new(page, limit, total),
    )))
}

#[instrument(skip(state, _auth))]
pub async fn get_rfp(
    State(state): State<AppState>,
    _auth: MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RfpWithClient>>, ApiError> {
    let rfp = Rfp::fetch_and_count_view(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("RFP not found".into()))?;
    let rfp = with_client(&state, rfp).await?;
    Ok(Json(ApiResponse::data(rfp)))
}

#[instrument(skip(state, user, payload))]
pub async fn update_rfp(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateRfpRequest>,
) -> Result<Json<ApiResponse<Rfp>>, ApiError> {
    let rfp = Rfp::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("RFP not found".into()))?;
    if rfp.client_id != user.id && user.role != Role::Admin {
        return Err(ApiError::Forbidden("Not authorized".into()));
    }

    let updated = Rfp::update(&state.db, id, payload.into())
        .await?
        .ok_or_else(|| ApiError::NotFound("RFP not found".into()))?;
    Ok(Json(ApiResponse::with_message(updated, "RFP updated")))
}

#[instrument(skip(state, user))]
pub async fn delete_rfp(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let rfp = Rfp::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("RFP not found".into()))?;
    if rfp.client_id != user.id && user.role != Role::Admin {
        return Err(ApiError::Forbidden("Not authorized".into()));
    }

    Rfp::delete(&state.db, id).await?;
    info!(rfp_id = %id, "rfp deleted");
    Ok(Json(ApiResponse::message("RFP deleted")))
}

#[instrument(skip(state, user))]
pub async fn publish_rfp(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Rfp>>, ApiError> {
    // Owner-scoped lookup: a foreign id reads as absent.
    let rfp = Rfp::publish(&state.db, id, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("RFP not found".into()))?;
    info!(rfp_id = %id, "rfp published");
    Ok(Json(ApiResponse::with_message(rfp, "RFP published")))
}

#[instrument(skip(state, user))]
pub async fn close_rfp(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Rfp>>, ApiError> {
    let rfp = Rfp::close(&state.db, id, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("RFP not found".into()))?;
    info!(rfp_id = %id, "rfp closed");
    Ok(Json(ApiResponse::with_message(rfp, "RFP closed")))
}

#[instrument(skip(state, user))]
pub async fn my_rfps(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<MyRfpsQuery>,
) -> Result<Json<ApiResponse<Vec<Rfp>>>, ApiError> {
    let rows = Rfp::list_by_client(&state.db, user.id, query.status).await?;
    Ok(Json(ApiResponse::data(rows)))
}
