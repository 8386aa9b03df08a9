// handlers/protected/clients.rs - /api/clients and /api/clients/:id handlers

use axum::extract::{Path, State};
use serde_json::Value;

use crate::api::format::present;
use crate::database::Record;
use crate::handlers::{body, list_params, JsonBody, ListQuery};
use crate::middleware::{ApiResponse, ApiResult, Page};
use crate::policy::Session;
use crate::services::{ClientService, Scope};
use crate::state::AppState;

/// GET /api/clients - portal sessions only ever see their own tenant
pub async fn list(session: Session, State(state): State<AppState>, query: ListQuery) -> ApiResult<Page<Value>> {
    let params = list_params(query)?;
    let page = ClientService::new(state.store.as_ref())
        .resources()
        .list(&session, &params, &Scope::root())
        .await?;
    Ok(ApiResponse::success(page.map(|doc| present(doc, &session))))
}

/// POST /api/clients - staff only; issues the tenant access token
pub async fn post(session: Session, State(state): State<AppState>, input: JsonBody) -> ApiResult<Value> {
    let client = ClientService::new(state.store.as_ref()).create(&session, body(input)?).await?;
    Ok(ApiResponse::created(present(client, &session)))
}

/// GET /api/clients/:id
pub async fn get(session: Session, State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let client = ClientService::new(state.store.as_ref()).require_client(&session, &id).await?;
    Ok(ApiResponse::success(present(client, &session)))
}

/// PUT /api/clients/:id
pub async fn put(session: Session, State(state): State<AppState>, Path(id): Path<String>, input: JsonBody) -> ApiResult<Value> {
    let record = Record::from_update_input(body(input)?)?;
    let client = ClientService::new(state.store.as_ref())
        .resources()
        .update(&session, &id, record, &Scope::root())
        .await?;
    Ok(ApiResponse::success(present(client, &session)))
}

/// DELETE /api/clients/:id - soft delete
pub async fn delete(session: Session, State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let client = ClientService::new(state.store.as_ref())
        .resources()
        .delete(&session, &id, &Scope::root())
        .await?;
    Ok(ApiResponse::success(present(client, &session)))
}

/// POST /api/clients/:id/restore
pub async fn restore(session: Session, State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let client = ClientService::new(state.store.as_ref())
        .resources()
        .restore(&session, &id, &Scope::root())
        .await?;
    Ok(ApiResponse::success(present(client, &session)))
}

/// POST /api/clients/:id/access-token - rotate the public support link
pub async fn regenerate_token(session: Session, State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let client = ClientService::new(state.store.as_ref())
        .regenerate_access_token(&session, &id)
        .await?;
    Ok(ApiResponse::success(present(client, &session)))
}
