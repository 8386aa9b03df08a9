// handlers/public/auth.rs - POST /api/auth/login handler

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::user_service::{LoginRequest, LoginResponse};
use crate::services::UserService;
use crate::state::AppState;

/// POST /api/auth/login - exchange email and password for a JWT
///
/// Input: `{ "email": "...", "password": "..." }`
/// Output: `{ "token": "...", "expiresIn": 86400, "user": { ... } }`
///
/// Unknown email, inactive account and wrong password all answer 401 with
/// the same message.
pub async fn login(State(state): State<AppState>, input: Result<Json<LoginRequest>, JsonRejection>) -> ApiResult<LoginResponse> {
    let Json(request) = input?;
    let response = UserService::new(state.store.as_ref()).login(request).await?;
    Ok(ApiResponse::success(response))
}
