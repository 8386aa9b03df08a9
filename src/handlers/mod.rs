// handlers/mod.rs - Two handler tiers
//
// Public (no session, credential in the URL) and Protected (bearer JWT,
// resolved by the `Session` extractor). Handlers only translate HTTP to a
// service call; authorization lives in the services and `policy`.

pub mod protected;
pub mod public;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query};
use serde_json::Value;

use crate::database::Collection;
use crate::error::ApiError;
use crate::services::ListParams;

/// JSON body, with malformed input reported in the error envelope
pub type JsonBody = Result<Json<Value>, JsonRejection>;

/// List query string, with malformed input reported in the error envelope
pub type ListQuery = Result<Query<ListParams>, QueryRejection>;

pub(crate) fn body(body: JsonBody) -> Result<Value, ApiError> {
    let Json(value) = body?;
    Ok(value)
}

pub(crate) fn list_params(query: ListQuery) -> Result<ListParams, ApiError> {
    let Query(params) = query?;
    Ok(params)
}

/// Map a path segment to its collection; unknown segments are plain 404s
pub(crate) fn segment(value: &str, lookup: fn(&str) -> Option<Collection>) -> Result<Collection, ApiError> {
    lookup(value).ok_or_else(|| ApiError::not_found(format!("Unknown resource '{}'", value)))
}
