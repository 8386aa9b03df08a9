// handlers/protected/auth.rs - GET /api/auth/whoami handler

use axum::extract::State;
use serde_json::Value;

use crate::middleware::{ApiResponse, ApiResult};
use crate::policy::Session;
use crate::services::UserService;
use crate::state::AppState;

/// GET /api/auth/whoami - current session and the user behind it
pub async fn whoami(session: Session, State(state): State<AppState>) -> ApiResult<Value> {
    let data = UserService::new(state.store.as_ref()).whoami(&session).await?;
    Ok(ApiResponse::success(data))
}
