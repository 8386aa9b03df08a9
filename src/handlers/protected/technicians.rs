// handlers/protected/technicians.rs - /api/technicians handlers (staff only)

use axum::extract::{Path, State};
use serde_json::Value;

use crate::api::format::present;
use crate::database::{Collection, Record};
use crate::handlers::{body, list_params, JsonBody, ListQuery};
use crate::middleware::{ApiResponse, ApiResult, Page};
use crate::policy::Session;
use crate::services::{Scope, TechnicianService};
use crate::state::AppState;

pub async fn list(session: Session, State(state): State<AppState>, query: ListQuery) -> ApiResult<Page<Value>> {
    let page = TechnicianService::new(state.store.as_ref())
        .resources()
        .list(&session, &list_params(query)?, &Scope::root())
        .await?;
    Ok(ApiResponse::success(page.map(|doc| present(doc, &session))))
}

pub async fn post(session: Session, State(state): State<AppState>, input: JsonBody) -> ApiResult<Value> {
    let tech = TechnicianService::new(state.store.as_ref()).create(&session, body(input)?).await?;
    Ok(ApiResponse::created(present(tech, &session)))
}

pub async fn get(session: Session, State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let tech = TechnicianService::new(state.store.as_ref())
        .resources()
        .get(&session, &id, &Scope::root())
        .await?;
    Ok(ApiResponse::success(present(tech, &session)))
}

pub async fn put(session: Session, State(state): State<AppState>, Path(id): Path<String>, input: JsonBody) -> ApiResult<Value> {
    let record = Record::from_update_input(body(input)?)?;
    let tech = TechnicianService::new(state.store.as_ref())
        .resources()
        .update(&session, &id, record, &Scope::root())
        .await?;
    Ok(ApiResponse::success(present(tech, &session)))
}

pub async fn delete(session: Session, State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let tech = TechnicianService::new(state.store.as_ref())
        .resources()
        .delete(&session, &id, &Scope::root())
        .await?;
    Ok(ApiResponse::success(present(tech, &session)))
}

async fn children(session: Session, state: AppState, id: String, child: Collection, query: ListQuery) -> ApiResult<Page<Value>> {
    let page = TechnicianService::new(state.store.as_ref())
        .list_children(&session, &id, child, &list_params(query)?)
        .await?;
    Ok(ApiResponse::success(page.map(|doc| present(doc, &session))))
}

async fn remove_child(session: Session, state: AppState, id: String, child: Collection, item_id: String) -> ApiResult<Value> {
    let doc = TechnicianService::new(state.store.as_ref())
        .delete_child(&session, &id, child, &item_id)
        .await?;
    Ok(ApiResponse::success(present(doc, &session)))
}

/// GET /api/technicians/:id/insurance
pub async fn insurance_list(session: Session, State(state): State<AppState>, Path(id): Path<String>, query: ListQuery) -> ApiResult<Page<Value>> {
    children(session, state, id, Collection::TechnicianInsurance, query).await
}

/// POST /api/technicians/:id/insurance
pub async fn insurance_post(session: Session, State(state): State<AppState>, Path(id): Path<String>, input: JsonBody) -> ApiResult<Value> {
    let doc = TechnicianService::new(state.store.as_ref())
        .add_insurance(&session, &id, body(input)?)
        .await?;
    Ok(ApiResponse::created(present(doc, &session)))
}

/// DELETE /api/technicians/:id/insurance/:item_id
pub async fn insurance_delete(
    session: Session,
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, String)>,
) -> ApiResult<Value> {
    remove_child(session, state, id, Collection::TechnicianInsurance, item_id).await
}

/// GET /api/technicians/:id/tags
pub async fn tags_list(session: Session, State(state): State<AppState>, Path(id): Path<String>, query: ListQuery) -> ApiResult<Page<Value>> {
    children(session, state, id, Collection::TechnicianTags, query).await
}

/// POST /api/technicians/:id/tags - 409 when the tag is already assigned
pub async fn tags_post(session: Session, State(state): State<AppState>, Path(id): Path<String>, input: JsonBody) -> ApiResult<Value> {
    let doc = TechnicianService::new(state.store.as_ref())
        .add_tag(&session, &id, body(input)?)
        .await?;
    Ok(ApiResponse::created(present(doc, &session)))
}

/// DELETE /api/technicians/:id/tags/:item_id
pub async fn tags_delete(
    session: Session,
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, String)>,
) -> ApiResult<Value> {
    remove_child(session, state, id, Collection::TechnicianTags, item_id).await
}
