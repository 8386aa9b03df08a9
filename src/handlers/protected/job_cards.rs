// handlers/protected/job_cards.rs - /api/job-cards handlers, including the
// nested children (assets, checklist, technicians, owners, comments)

use axum::extract::{Path, State};
use serde_json::Value;

use crate::api::format::present;
use crate::database::Collection;
use crate::handlers::{body, list_params, segment, JsonBody, ListQuery};
use crate::middleware::{ApiResponse, ApiResult, Page};
use crate::policy::Session;
use crate::services::{JobCardService, Scope};
use crate::state::AppState;

pub async fn list(session: Session, State(state): State<AppState>, query: ListQuery) -> ApiResult<Page<Value>> {
    let page = JobCardService::new(state.store.as_ref())
        .resources()
        .list(&session, &list_params(query)?, &Scope::root())
        .await?;
    Ok(ApiResponse::success(page.map(|doc| present(doc, &session))))
}

pub async fn post(session: Session, State(state): State<AppState>, input: JsonBody) -> ApiResult<Value> {
    let card = JobCardService::new(state.store.as_ref()).create(&session, body(input)?).await?;
    Ok(ApiResponse::created(present(card, &session)))
}

pub async fn get(session: Session, State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let card = JobCardService::new(state.store.as_ref())
        .resources()
        .get(&session, &id, &Scope::root())
        .await?;
    Ok(ApiResponse::success(present(card, &session)))
}

pub async fn put(session: Session, State(state): State<AppState>, Path(id): Path<String>, input: JsonBody) -> ApiResult<Value> {
    let card = JobCardService::new(state.store.as_ref()).update(&session, &id, body(input)?).await?;
    Ok(ApiResponse::success(present(card, &session)))
}

pub async fn delete(session: Session, State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let card = JobCardService::new(state.store.as_ref())
        .resources()
        .delete(&session, &id, &Scope::root())
        .await?;
    Ok(ApiResponse::success(present(card, &session)))
}

/// GET /api/job-cards/:id/:child
pub async fn child_list(
    session: Session,
    State(state): State<AppState>,
    Path((id, child)): Path<(String, String)>,
    query: ListQuery,
) -> ApiResult<Page<Value>> {
    let child = segment(&child, Collection::from_job_card_child)?;
    let page = JobCardService::new(state.store.as_ref())
        .list_children(&session, &id, child, &list_params(query)?)
        .await?;
    Ok(ApiResponse::success(page.map(|doc| present(doc, &session))))
}

/// POST /api/job-cards/:id/:child
pub async fn child_post(
    session: Session,
    State(state): State<AppState>,
    Path((id, child)): Path<(String, String)>,
    input: JsonBody,
) -> ApiResult<Value> {
    let child = segment(&child, Collection::from_job_card_child)?;
    let doc = JobCardService::new(state.store.as_ref())
        .create_child(&session, &id, child, body(input)?)
        .await?;
    Ok(ApiResponse::created(present(doc, &session)))
}

/// PUT /api/job-cards/:id/:child/:child_id
pub async fn child_put(
    session: Session,
    State(state): State<AppState>,
    Path((id, child, child_id)): Path<(String, String, String)>,
    input: JsonBody,
) -> ApiResult<Value> {
    let child = segment(&child, Collection::from_job_card_child)?;
    let doc = JobCardService::new(state.store.as_ref())
        .update_child(&session, &id, child, &child_id, body(input)?)
        .await?;
    Ok(ApiResponse::success(present(doc, &session)))
}

/// DELETE /api/job-cards/:id/:child/:child_id
pub async fn child_delete(
    session: Session,
    State(state): State<AppState>,
    Path((id, child, child_id)): Path<(String, String, String)>,
) -> ApiResult<Value> {
    let child = segment(&child, Collection::from_job_card_child)?;
    let doc = JobCardService::new(state.store.as_ref())
        .delete_child(&session, &id, child, &child_id)
        .await?;
    Ok(ApiResponse::success(present(doc, &session)))
}
