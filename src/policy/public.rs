//! Resolution of the two public credentials: a tenant's access token and a
//! record's unique id. Neither involves a session.

use serde_json::json;

use super::PolicyResult;
use crate::database::{Collection, Document, DocumentStore};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::types::RecordStatus;

/// Same message for malformed, unknown and deactivated tokens
pub const INVALID_LINK_MESSAGE: &str = "This link is invalid or has expired";

const MAX_TOKEN_LEN: usize = 128;

/// Record kinds reachable by unique id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicRecordKind {
    Asset,
    JobCard,
}

impl PublicRecordKind {
    pub fn collection(&self) -> Collection {
        match self {
            PublicRecordKind::Asset => Collection::Assets,
            PublicRecordKind::JobCard => Collection::JobCards,
        }
    }
}

fn well_formed(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_TOKEN_LEN
        && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// The active tenant owning `token`
pub async fn resolve_public_token(store: &dyn DocumentStore, token: &str) -> PolicyResult<Document> {
    if !well_formed(token) {
        tracing::debug!("Rejected malformed access token");
        return Err(ApiError::not_found(INVALID_LINK_MESSAGE));
    }

    let mut filter = Filter::new();
    filter
        .where_eq("accessToken", token)
        .where_eq(RecordStatus::FIELD, RecordStatus::Active.code());

    store
        .find_one(Collection::Clients, &filter)
        .await?
        .ok_or_else(|| ApiError::not_found(INVALID_LINK_MESSAGE))
}

/// The single non-deleted record carrying `unique_id`. No tenant check: the
/// unique id is itself the credential.
pub async fn resolve_public_record(
    store: &dyn DocumentStore,
    unique_id: &str,
    kind: PublicRecordKind,
) -> PolicyResult<Document> {
    if !well_formed(unique_id) {
        return Err(ApiError::not_found(INVALID_LINK_MESSAGE));
    }

    let mut filter = Filter::new();
    filter.where_clause(json!({ "uniqueId": unique_id }))?;
    filter.limit(2, None)?;

    let mut found = store.find(kind.collection(), &filter).await?;
    match found.len() {
        1 => Ok(found.remove(0)),
        0 => Err(ApiError::not_found(INVALID_LINK_MESSAGE)),
        n => {
            tracing::error!("{} documents in {} share one uniqueId", n, kind.collection());
            Err(ApiError::not_found(INVALID_LINK_MESSAGE))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::record::deleted_changes;
    use crate::database::{MemoryDocumentStore, Record};
    use axum::http::StatusCode;

    async fn seed_client(store: &MemoryDocumentStore, token: &str, status: i64) {
        let mut record = Record::new();
        record.set("name", "Acme").set("accessToken", token).set("status", status);
        record.stamp_new("test");
        store.insert(Collection::Clients, record.into_document()).await.unwrap();
    }

    #[tokio::test]
    async fn token_failures_are_indistinguishable() {
        let store = MemoryDocumentStore::new();
        seed_client(&store, "activetoken", 1).await;
        seed_client(&store, "inactivetoken", 0).await;

        assert!(resolve_public_token(&store, "activetoken").await.is_ok());

        let too_long = "x".repeat(500);
        let mut outcomes = Vec::new();
        for token in ["", "bad token!", too_long.as_str(), "unknowntoken", "inactivetoken"] {
            let err = resolve_public_token(&store, token).await.unwrap_err();
            outcomes.push((err.status_code(), err.message().to_string()));
        }
        assert!(outcomes.iter().all(|o| *o == (StatusCode::NOT_FOUND, INVALID_LINK_MESSAGE.to_string())));
    }

    #[tokio::test]
    async fn deleted_records_are_not_resolvable() {
        let store = MemoryDocumentStore::new();
        let mut record = Record::new();
        record.set("uniqueId", "asset-1").set("clientId", "C1");
        record.stamp_new("test");
        let doc = store.insert(Collection::Assets, record.into_document()).await.unwrap();

        let found = resolve_public_record(&store, "asset-1", PublicRecordKind::Asset).await.unwrap();
        assert_eq!(found["id"], doc["id"]);
        assert!(resolve_public_record(&store, "asset-1", PublicRecordKind::JobCard).await.is_err());

        store.update(Collection::Assets, doc["id"].as_str().unwrap(), deleted_changes()).await.unwrap();
        assert!(resolve_public_record(&store, "asset-1", PublicRecordKind::Asset).await.is_err());
    }
}
