// handlers/protected/users.rs - /api/users handlers (staff only)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use serde_json::Value;

use crate::api::format::present;
use crate::handlers::{list_params, ListQuery};
use crate::middleware::{ApiResponse, ApiResult, Page};
use crate::policy::Session;
use crate::services::user_service::{CreateUserRequest, UpdateUserRequest};
use crate::services::{Scope, UserService};
use crate::state::AppState;

pub async fn list(session: Session, State(state): State<AppState>, query: ListQuery) -> ApiResult<Page<Value>> {
    let page = UserService::new(state.store.as_ref())
        .resources()
        .list(&session, &list_params(query)?, &Scope::root())
        .await?;
    Ok(ApiResponse::success(page.map(|doc| present(doc, &session))))
}

pub async fn post(
    session: Session,
    State(state): State<AppState>,
    input: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = input?;
    let user = UserService::new(state.store.as_ref()).create(&session, request).await?;
    Ok(ApiResponse::created(present(user, &session)))
}

pub async fn get(session: Session, State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let user = UserService::new(state.store.as_ref())
        .resources()
        .get(&session, &id, &Scope::root())
        .await?;
    Ok(ApiResponse::success(present(user, &session)))
}

pub async fn put(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<String>,
    input: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = input?;
    let user = UserService::new(state.store.as_ref()).update(&session, &id, request).await?;
    Ok(ApiResponse::success(present(user, &session)))
}

pub async fn delete(session: Session, State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let user = UserService::new(state.store.as_ref())
        .resources()
        .delete(&session, &id, &Scope::root())
        .await?;
    Ok(ApiResponse::success(present(user, &session)))
}
