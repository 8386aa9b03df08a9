// handlers/protected/client_children.rs - /api/clients/:id/:kind[/:item_id] handlers
//
// kind: sites, assets, contacts, documents, notes, service-agreements

use axum::extract::{Path, State};
use serde_json::Value;

use crate::api::format::present;
use crate::database::Collection;
use crate::handlers::{body, list_params, segment, JsonBody, ListQuery};
use crate::middleware::{ApiResponse, ApiResult, Page};
use crate::policy::Session;
use crate::services::ClientService;
use crate::state::AppState;

pub async fn list(
    session: Session,
    State(state): State<AppState>,
    Path((client_id, kind)): Path<(String, String)>,
    query: ListQuery,
) -> ApiResult<Page<Value>> {
    let kind = segment(&kind, Collection::from_client_kind)?;
    let page = ClientService::new(state.store.as_ref())
        .list_children(&session, &client_id, kind, &list_params(query)?)
        .await?;
    Ok(ApiResponse::success(page.map(|doc| present(doc, &session))))
}

pub async fn post(
    session: Session,
    State(state): State<AppState>,
    Path((client_id, kind)): Path<(String, String)>,
    input: JsonBody,
) -> ApiResult<Value> {
    let kind = segment(&kind, Collection::from_client_kind)?;
    let doc = ClientService::new(state.store.as_ref())
        .create_child(&session, &client_id, kind, body(input)?)
        .await?;
    Ok(ApiResponse::created(present(doc, &session)))
}

pub async fn get(
    session: Session,
    State(state): State<AppState>,
    Path((client_id, kind, item_id)): Path<(String, String, String)>,
) -> ApiResult<Value> {
    let kind = segment(&kind, Collection::from_client_kind)?;
    let doc = ClientService::new(state.store.as_ref())
        .get_child(&session, &client_id, kind, &item_id)
        .await?;
    Ok(ApiResponse::success(present(doc, &session)))
}

pub async fn put(
    session: Session,
    State(state): State<AppState>,
    Path((client_id, kind, item_id)): Path<(String, String, String)>,
    input: JsonBody,
) -> ApiResult<Value> {
    let kind = segment(&kind, Collection::from_client_kind)?;
    let doc = ClientService::new(state.store.as_ref())
        .update_child(&session, &client_id, kind, &item_id, body(input)?)
        .await?;
    Ok(ApiResponse::success(present(doc, &session)))
}

pub async fn delete(
    session: Session,
    State(state): State<AppState>,
    Path((client_id, kind, item_id)): Path<(String, String, String)>,
) -> ApiResult<Value> {
    let kind = segment(&kind, Collection::from_client_kind)?;
    let doc = ClientService::new(state.store.as_ref())
        .delete_child(&session, &client_id, kind, &item_id)
        .await?;
    Ok(ApiResponse::success(present(doc, &session)))
}
