// handlers/protected/support_tickets.rs - /api/support-tickets handlers

use axum::extract::{Path, State};
use serde_json::{json, Value};

use crate::api::format::{present, present_all};
use crate::database::Collection;
use crate::handlers::{body, list_params, segment, JsonBody, ListQuery};
use crate::middleware::{ApiResponse, ApiResult, Page};
use crate::policy::Session;
use crate::services::{Scope, TicketService, TicketView};
use crate::state::AppState;

fn present_view(view: TicketView, session: &Session) -> Value {
    let mut ticket = present(view.ticket, session);
    ticket["detail"] = view.detail.map(|d| present(d, session)).unwrap_or(Value::Null);
    ticket["logs"] = json!(present_all(view.logs, session));
    ticket
}

pub async fn list(session: Session, State(state): State<AppState>, query: ListQuery) -> ApiResult<Page<Value>> {
    let page = TicketService::new(state.store.as_ref())
        .resources()
        .list(&session, &list_params(query)?, &Scope::root())
        .await?;
    Ok(ApiResponse::success(page.map(|doc| present(doc, &session))))
}

/// POST /api/support-tickets - ticket, detail and log are written together
pub async fn post(session: Session, State(state): State<AppState>, input: JsonBody) -> ApiResult<Value> {
    let view = TicketService::new(state.store.as_ref()).create(&session, body(input)?).await?;
    Ok(ApiResponse::created(present_view(view, &session)))
}

/// GET /api/support-tickets/:id - ticket with `detail` and `logs`
pub async fn get(session: Session, State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let view = TicketService::new(state.store.as_ref()).get(&session, &id).await?;
    Ok(ApiResponse::success(present_view(view, &session)))
}

pub async fn put(session: Session, State(state): State<AppState>, Path(id): Path<String>, input: JsonBody) -> ApiResult<Value> {
    let ticket = TicketService::new(state.store.as_ref()).update(&session, &id, body(input)?).await?;
    Ok(ApiResponse::success(present(ticket, &session)))
}

pub async fn delete(session: Session, State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let ticket = TicketService::new(state.store.as_ref())
        .resources()
        .delete(&session, &id, &Scope::root())
        .await?;
    Ok(ApiResponse::success(present(ticket, &session)))
}

pub async fn child_list(
    session: Session,
    State(state): State<AppState>,
    Path((id, child)): Path<(String, String)>,
    query: ListQuery,
) -> ApiResult<Page<Value>> {
    let child = segment(&child, Collection::from_ticket_child)?;
    let page = TicketService::new(state.store.as_ref())
        .list_children(&session, &id, child, &list_params(query)?)
        .await?;
    Ok(ApiResponse::success(page.map(|doc| present(doc, &session))))
}

pub async fn child_post(
    session: Session,
    State(state): State<AppState>,
    Path((id, child)): Path<(String, String)>,
    input: JsonBody,
) -> ApiResult<Value> {
    let child = segment(&child, Collection::from_ticket_child)?;
    let doc = TicketService::new(state.store.as_ref())
        .create_child(&session, &id, child, body(input)?)
        .await?;
    Ok(ApiResponse::created(present(doc, &session)))
}

pub async fn child_put(
    session: Session,
    State(state): State<AppState>,
    Path((id, child, child_id)): Path<(String, String, String)>,
    input: JsonBody,
) -> ApiResult<Value> {
    let child = segment(&child, Collection::from_ticket_child)?;
    let doc = TicketService::new(state.store.as_ref())
        .update_child(&session, &id, child, &child_id, body(input)?)
        .await?;
    Ok(ApiResponse::success(present(doc, &session)))
}

pub async fn child_delete(
    session: Session,
    State(state): State<AppState>,
    Path((id, child, child_id)): Path<(String, String, String)>,
) -> ApiResult<Value> {
    let child = segment(&child, Collection::from_ticket_child)?;
    let doc = TicketService::new(state.store.as_ref())
        .delete_child(&session, &id, child, &child_id)
        .await?;
    Ok(ApiResponse::success(present(doc, &session)))
}
