use serde_json::Value;

use super::resource_service::{ListParams, ResourceService, Scope};
use crate::database::record::new_token;
use crate::database::{Collection, Document, DocumentStore, Record};
use crate::error::ApiError;
use crate::middleware::Page;
use crate::policy::{self, Session};

/// Tenants. Each client carries the access token for its public support page.
pub struct ClientService<'a> {
    store: &'a dyn DocumentStore,
    resources: ResourceService<'a>,
}

impl<'a> ClientService<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            resources: ResourceService::new(store, Collection::Clients),
        }
    }

    pub fn resources(&self) -> &ResourceService<'a> {
        &self.resources
    }

    pub async fn create(&self, session: &Session, input: Value) -> Result<Document, ApiError> {
        let record = Record::from_api_input(input)?;
        record.require_str("name")?;

        let mut record = self.resources.prepare_create(session, record, &Scope::root())?;
        record.set("accessToken", new_token());

        let client = self.store.insert(Collection::Clients, record.into_document()).await?;
        tracing::info!(user_id = %session.user_id, "Created client {}", client["id"]);
        Ok(client)
    }

    /// Issue a new access token; links built on the old one stop working at once
    pub async fn regenerate_access_token(&self, session: &Session, id: &str) -> Result<Document, ApiError> {
        policy::require_staff(session)?;
        self.resources.prepare_update(session, id, &Scope::root()).await?;

        let mut changes = Record::new();
        changes.set("accessToken", new_token()).touch_updated_at();
        let client = self.store.update(Collection::Clients, id, changes.into_document()).await?;

        tracing::info!(user_id = %session.user_id, "Regenerated access token for client {}", id);
        Ok(client)
    }

    /// Live client for a nested route, after the tenant check on its id
    pub async fn require_client(&self, session: &Session, id: &str) -> Result<Document, ApiError> {
        policy::assert_tenant_access(session, id)?;
        self.resources.fetch(id).await
    }

    pub async fn list_children(
        &self,
        session: &Session,
        client_id: &str,
        kind: Collection,
        params: &ListParams,
    ) -> Result<Page<Document>, ApiError> {
        self.require_client(session, client_id).await?;
        ResourceService::new(self.store, kind).list(session, params, &Scope::tenant(client_id)).await
    }

    pub async fn get_child(&self, session: &Session, client_id: &str, kind: Collection, item_id: &str) -> Result<Document, ApiError> {
        self.require_client(session, client_id).await?;
        ResourceService::new(self.store, kind).get(session, item_id, &Scope::tenant(client_id)).await
    }

    /// Assets also get the unique id behind their public links
    pub async fn create_child(&self, session: &Session, client_id: &str, kind: Collection, input: Value) -> Result<Document, ApiError> {
        self.require_client(session, client_id).await?;
        let mut record = Record::from_api_input(input)?;
        if kind == Collection::Assets {
            record.set("uniqueId", new_token());
        }
        ResourceService::new(self.store, kind).create(session, record, &Scope::tenant(client_id)).await
    }

    pub async fn update_child(
        &self,
        session: &Session,
        client_id: &str,
        kind: Collection,
        item_id: &str,
        input: Value,
    ) -> Result<Document, ApiError> {
        self.require_client(session, client_id).await?;
        let record = Record::from_update_input(input)?;
        ResourceService::new(self.store, kind).update(session, item_id, record, &Scope::tenant(client_id)).await
    }

    pub async fn delete_child(&self, session: &Session, client_id: &str, kind: Collection, item_id: &str) -> Result<Document, ApiError> {
        self.require_client(session, client_id).await?;
        ResourceService::new(self.store, kind).delete(session, item_id, &Scope::tenant(client_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDocumentStore;
    use crate::policy::public::resolve_public_token;
    use crate::types::Role;
    use serde_json::json;

    fn staff() -> Session {
        Session { user_id: "admin".into(), role: Role::SuperAdmin, client_id: None }
    }

    #[tokio::test]
    async fn regenerating_token_invalidates_old_links() {
        let store = MemoryDocumentStore::new();
        let clients = ClientService::new(&store);
        let client = clients.create(&staff(), json!({ "name": "Acme" })).await.unwrap();
        let id = client["id"].as_str().unwrap();
        let old_token = client["accessToken"].as_str().unwrap().to_string();
        assert!(resolve_public_token(&store, &old_token).await.is_ok());

        let updated = clients.regenerate_access_token(&staff(), id).await.unwrap();
        let new_token = updated["accessToken"].as_str().unwrap();
        assert_ne!(new_token, old_token);
        assert!(resolve_public_token(&store, &old_token).await.is_err());
        assert!(resolve_public_token(&store, new_token).await.is_ok());
    }

    #[tokio::test]
    async fn portal_users_cannot_create_or_rotate() {
        let store = MemoryDocumentStore::new();
        let clients = ClientService::new(&store);
        let portal = Session { user_id: "p".into(), role: Role::ClientAdmin, client_id: Some("C1".into()) };
        assert!(clients.create(&portal, json!({ "name": "Acme" })).await.is_err());
        assert!(clients.regenerate_access_token(&portal, "C1").await.is_err());
        assert!(clients.create(&staff(), json!({ "name": "" })).await.is_err());
    }

    #[tokio::test]
    async fn nested_assets_get_unique_ids_and_stay_in_tenant() {
        let store = MemoryDocumentStore::new();
        let clients = ClientService::new(&store);
        let c1 = clients.create(&staff(), json!({ "name": "One" })).await.unwrap();
        let c2 = clients.create(&staff(), json!({ "name": "Two" })).await.unwrap();
        let (c1, c2) = (c1["id"].as_str().unwrap(), c2["id"].as_str().unwrap());

        let asset = clients.create_child(&staff(), c1, Collection::Assets, json!({ "name": "Pump" })).await.unwrap();
        assert!(asset["uniqueId"].is_string());
        let asset_id = asset["id"].as_str().unwrap();

        let portal = Session { user_id: "p".into(), role: Role::ClientUser, client_id: Some(c2.into()) };
        let err = clients.get_child(&portal, c1, Collection::Assets, asset_id).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
        let err = clients.list_children(&portal, c1, Collection::Assets, &ListParams::default()).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
        let err = clients.get_child(&staff(), c2, Collection::Assets, asset_id).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    }
}
