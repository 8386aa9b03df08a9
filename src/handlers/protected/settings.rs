// handlers/protected/settings.rs - GET/PUT /api/settings handlers

use axum::extract::State;
use serde_json::Value;

use crate::api::format::present;
use crate::handlers::{body, JsonBody};
use crate::middleware::{ApiResponse, ApiResult};
use crate::policy::Session;
use crate::services::SettingsService;
use crate::state::AppState;

pub async fn get(session: Session, State(state): State<AppState>) -> ApiResult<Value> {
    let settings = SettingsService::new(state.store.as_ref()).get(&session).await?;
    Ok(ApiResponse::success(present(settings, &session)))
}

/// PUT /api/settings - staff only, merged into the stored settings
pub async fn put(session: Session, State(state): State<AppState>, input: JsonBody) -> ApiResult<Value> {
    let settings = SettingsService::new(state.store.as_ref()).update(&session, body(input)?).await?;
    Ok(ApiResponse::success(present(settings, &session)))
}
