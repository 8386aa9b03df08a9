// handlers/public/portal.rs - /api/public/* handlers
//
// No session. `:access_token` resolves a tenant, `:unique_id` resolves one
// asset or job card; every failure to resolve is the same 404.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use serde_json::{json, Value};

use crate::api::format::present_public;
use crate::handlers::{body, JsonBody};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::public_service::JobCardProgress;
use crate::services::PublicService;
use crate::state::AppState;

/// GET /api/public/support/:access_token
pub async fn support_get(State(state): State<AppState>, Path(access_token): Path<String>) -> ApiResult<Value> {
    let data = PublicService::new(state.store.as_ref()).support_info(&access_token).await?;
    Ok(ApiResponse::success(data))
}

/// POST /api/public/support/:access_token - raise a support ticket
pub async fn support_post(State(state): State<AppState>, Path(access_token): Path<String>, input: JsonBody) -> ApiResult<Value> {
    let view = PublicService::new(state.store.as_ref())
        .create_ticket(&access_token, body(input)?)
        .await?;
    let mut ticket = present_public(view.ticket);
    ticket["detail"] = view.detail.map(present_public).unwrap_or(Value::Null);
    Ok(ApiResponse::created(ticket))
}

/// GET /api/public/log-maintenance/:unique_id
pub async fn maintenance_get(State(state): State<AppState>, Path(unique_id): Path<String>) -> ApiResult<Value> {
    let data = PublicService::new(state.store.as_ref()).asset_summary(&unique_id).await?;
    Ok(ApiResponse::success(json!({ "asset": data })))
}

/// POST /api/public/log-maintenance/:unique_id
pub async fn maintenance_post(State(state): State<AppState>, Path(unique_id): Path<String>, input: JsonBody) -> ApiResult<Value> {
    let log = PublicService::new(state.store.as_ref())
        .log_maintenance(&unique_id, body(input)?)
        .await?;
    Ok(ApiResponse::created(log))
}

/// GET /api/public/client-asset/:unique_id
pub async fn client_asset_get(State(state): State<AppState>, Path(unique_id): Path<String>) -> ApiResult<Value> {
    let asset = PublicService::new(state.store.as_ref()).asset_detail(&unique_id).await?;
    Ok(ApiResponse::success(asset))
}

/// GET /api/public/history/:unique_id
pub async fn history_get(State(state): State<AppState>, Path(unique_id): Path<String>) -> ApiResult<Value> {
    let history = PublicService::new(state.store.as_ref()).asset_history(&unique_id).await?;
    Ok(ApiResponse::success(history))
}

/// GET /api/public/job-card/:unique_id
pub async fn job_card_get(State(state): State<AppState>, Path(unique_id): Path<String>) -> ApiResult<Value> {
    let card = PublicService::new(state.store.as_ref()).job_card(&unique_id).await?;
    Ok(ApiResponse::success(card))
}

/// PUT /api/public/job-card/:unique_id - checklist completion and notes
pub async fn job_card_put(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
    input: Result<Json<JobCardProgress>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(progress) = input?;
    let card = PublicService::new(state.store.as_ref())
        .update_job_card(&unique_id, progress)
        .await?;
    Ok(ApiResponse::success(card))
}
