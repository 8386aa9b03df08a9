use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;
use crate::policy::{self, Session};

/// Protected handlers take `Session` as their first argument; a request
/// without a valid bearer token never reaches the handler body.
#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(session.clone());
        }

        let session = policy::require_session(&parts.headers)?;
        parts.extensions.insert(session.clone());
        Ok(session)
    }
}
