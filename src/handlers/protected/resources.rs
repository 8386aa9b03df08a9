// handlers/protected/resources.rs - /api/resources and /api/checklists handlers
//
// Shared library records: readable by any session, written by staff.

use axum::extract::{Path, State};
use serde_json::Value;

use crate::api::format::present;
use crate::database::{Collection, Record};
use crate::handlers::{body, list_params, JsonBody, ListQuery};
use crate::middleware::{ApiResponse, ApiResult, Page};
use crate::policy::Session;
use crate::services::{ResourceService, Scope};
use crate::state::AppState;

async fn list(collection: Collection, session: Session, state: AppState, query: ListQuery) -> ApiResult<Page<Value>> {
    let page = ResourceService::new(state.store.as_ref(), collection)
        .list(&session, &list_params(query)?, &Scope::root())
        .await?;
    Ok(ApiResponse::success(page.map(|doc| present(doc, &session))))
}

async fn create(collection: Collection, session: Session, state: AppState, input: JsonBody) -> ApiResult<Value> {
    let record = Record::from_api_input(body(input)?)?;
    record.require_str("name")?;
    let doc = ResourceService::new(state.store.as_ref(), collection)
        .create(&session, record, &Scope::root())
        .await?;
    Ok(ApiResponse::created(present(doc, &session)))
}

async fn show(collection: Collection, session: Session, state: AppState, id: String) -> ApiResult<Value> {
    let doc = ResourceService::new(state.store.as_ref(), collection)
        .get(&session, &id, &Scope::root())
        .await?;
    Ok(ApiResponse::success(present(doc, &session)))
}

async fn update(collection: Collection, session: Session, state: AppState, id: String, input: JsonBody) -> ApiResult<Value> {
    let record = Record::from_update_input(body(input)?)?;
    let doc = ResourceService::new(state.store.as_ref(), collection)
        .update(&session, &id, record, &Scope::root())
        .await?;
    Ok(ApiResponse::success(present(doc, &session)))
}

async fn remove(collection: Collection, session: Session, state: AppState, id: String) -> ApiResult<Value> {
    let doc = ResourceService::new(state.store.as_ref(), collection)
        .delete(&session, &id, &Scope::root())
        .await?;
    Ok(ApiResponse::success(present(doc, &session)))
}

pub async fn resources_list(session: Session, State(state): State<AppState>, query: ListQuery) -> ApiResult<Page<Value>> {
    list(Collection::Resources, session, state, query).await
}

pub async fn resources_post(session: Session, State(state): State<AppState>, input: JsonBody) -> ApiResult<Value> {
    create(Collection::Resources, session, state, input).await
}

pub async fn resources_get(session: Session, State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    show(Collection::Resources, session, state, id).await
}

pub async fn resources_put(session: Session, State(state): State<AppState>, Path(id): Path<String>, input: JsonBody) -> ApiResult<Value> {
    update(Collection::Resources, session, state, id, input).await
}

pub async fn resources_delete(session: Session, State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    remove(Collection::Resources, session, state, id).await
}

pub async fn checklists_list(session: Session, State(state): State<AppState>, query: ListQuery) -> ApiResult<Page<Value>> {
    list(Collection::Checklists, session, state, query).await
}

pub async fn checklists_post(session: Session, State(state): State<AppState>, input: JsonBody) -> ApiResult<Value> {
    create(Collection::Checklists, session, state, input).await
}

pub async fn checklists_get(session: Session, State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    show(Collection::Checklists, session, state, id).await
}

pub async fn checklists_put(session: Session, State(state): State<AppState>, Path(id): Path<String>, input: JsonBody) -> ApiResult<Value> {
    update(Collection::Checklists, session, state, id, input).await
}

pub async fn checklists_delete(session: Session, State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    remove(Collection::Checklists, session, state, id).await
}
