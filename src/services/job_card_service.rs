use serde_json::Value;

use super::resource_service::{ListParams, ResourceService, Scope};
use crate::database::record::{doc_str, new_token};
use crate::database::{Collection, Document, DocumentStore, Record};
use crate::error::ApiError;
use crate::middleware::Page;
use crate::policy::Session;
use crate::types::JobCardStatus;

const JOB_CARD_ID_FIELD: &str = "jobCardId";

pub struct JobCardService<'a> {
    store: &'a dyn DocumentStore,
    cards: ResourceService<'a>,
}

impl<'a> JobCardService<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            cards: ResourceService::new(store, Collection::JobCards),
        }
    }

    pub fn resources(&self) -> &ResourceService<'a> {
        &self.cards
    }

    pub async fn create(&self, session: &Session, input: Value) -> Result<Document, ApiError> {
        let record = Record::from_api_input(input)?;
        let client_id = record.require_str("clientId")?;
        record.read_code::<JobCardStatus>(JobCardStatus::FIELD)?;

        let mut record = self.cards.prepare_create(session, record, &Scope::root())?;
        ResourceService::new(self.store, Collection::Clients)
            .fetch(&client_id)
            .await
            .map_err(|_| ApiError::invalid_field("clientId", "Client not found"))?;

        record
            .set("uniqueId", new_token())
            .set_if_empty(JobCardStatus::FIELD, JobCardStatus::Open.code());

        let card = self.store.insert(Collection::JobCards, record.into_document()).await?;
        tracing::info!(user_id = %session.user_id, "Created job card {} for client {}", card["id"], client_id);
        Ok(card)
    }

    pub async fn update(&self, session: &Session, id: &str, input: Value) -> Result<Document, ApiError> {
        let record = Record::from_update_input(input)?;
        record.read_code::<JobCardStatus>(JobCardStatus::FIELD)?;
        self.cards.update(session, id, record, &Scope::root()).await
    }

    /// Scope for the children of a job card the session may read
    pub async fn child_scope(&self, session: &Session, job_card_id: &str) -> Result<(Document, Scope), ApiError> {
        let card = self.cards.get(session, job_card_id, &Scope::root()).await?;
        let client_id = doc_str(&card, "clientId").map(str::to_string);
        Ok((card, Scope::child(JOB_CARD_ID_FIELD, job_card_id, client_id)))
    }

    pub async fn list_children(
        &self,
        session: &Session,
        job_card_id: &str,
        child: Collection,
        params: &ListParams,
    ) -> Result<Page<Document>, ApiError> {
        let (_, scope) = self.child_scope(session, job_card_id).await?;
        ResourceService::new(self.store, child).list(session, params, &scope).await
    }

    pub async fn create_child(
        &self,
        session: &Session,
        job_card_id: &str,
        child: Collection,
        input: Value,
    ) -> Result<Document, ApiError> {
        let (card, scope) = self.child_scope(session, job_card_id).await?;
        let record = Record::from_api_input(input)?;

        match child {
            Collection::JobCardAssets => self.check_asset_link(&card, &record).await?,
            Collection::JobCardTechnicians => self.check_technician_link(&record).await?,
            Collection::JobCardComments => {
                record.require_str("comment")?;
            }
            Collection::JobCardChecklist => {
                record.require_str("label")?;
            }
            _ => {}
        }

        ResourceService::new(self.store, child).create(session, record, &scope).await
    }

    pub async fn update_child(
        &self,
        session: &Session,
        job_card_id: &str,
        child: Collection,
        child_id: &str,
        input: Value,
    ) -> Result<Document, ApiError> {
        let (_, scope) = self.child_scope(session, job_card_id).await?;
        let record = Record::from_update_input(input)?;
        if child == Collection::JobCardAssets && record.contains("assetId") {
            return Err(ApiError::invalid_field("assetId", "Remove and re-add the asset instead"));
        }
        ResourceService::new(self.store, child).update(session, child_id, record, &scope).await
    }

    pub async fn delete_child(
        &self,
        session: &Session,
        job_card_id: &str,
        child: Collection,
        child_id: &str,
    ) -> Result<Document, ApiError> {
        let (_, scope) = self.child_scope(session, job_card_id).await?;
        ResourceService::new(self.store, child).delete(session, child_id, &scope).await
    }

    /// A linked asset must belong to the job card's client
    async fn check_asset_link(&self, card: &Document, record: &Record) -> Result<(), ApiError> {
        let asset_id = record.require_str("assetId")?;
        let asset = ResourceService::new(self.store, Collection::Assets)
            .fetch(&asset_id)
            .await
            .map_err(|_| ApiError::invalid_field("assetId", "Asset not found"))?;

        if doc_str(&asset, "clientId") != doc_str(card, "clientId") {
            return Err(ApiError::invalid_field("assetId", "Asset belongs to a different client"));
        }
        Ok(())
    }

    async fn check_technician_link(&self, record: &Record) -> Result<(), ApiError> {
        let technician_id = record.require_str("technicianId")?;
        ResourceService::new(self.store, Collection::Technicians)
            .fetch(&technician_id)
            .await
            .map_err(|_| ApiError::invalid_field("technicianId", "Technician not found"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::client_service::ClientService;
    use crate::database::MemoryDocumentStore;
    use crate::types::Role;
    use axum::http::StatusCode;
    use serde_json::json;

    fn staff() -> Session {
        Session { user_id: "admin".into(), role: Role::Admin, client_id: None }
    }

    async fn seed(store: &MemoryDocumentStore) -> (String, String, Document) {
        let clients = ClientService::new(store);
        let c1 = clients.create(&staff(), json!({ "name": "One" })).await.unwrap();
        let c2 = clients.create(&staff(), json!({ "name": "Two" })).await.unwrap();
        let c1 = c1["id"].as_str().unwrap().to_string();
        let c2 = c2["id"].as_str().unwrap().to_string();
        let card = JobCardService::new(store)
            .create(&staff(), json!({ "clientId": c1, "title": "Spray" }))
            .await
            .unwrap();
        (c1, c2, card)
    }

    #[tokio::test]
    async fn create_defaults_status_and_unique_id() {
        let store = MemoryDocumentStore::new();
        let (_, _, card) = seed(&store).await;
        assert_eq!(card["jobStatus"], json!(1));
        assert!(card["uniqueId"].as_str().is_some_and(|u| u.len() == 32));

        let err = JobCardService::new(&store)
            .create(&staff(), json!({ "clientId": "nope" }))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn linked_asset_must_share_the_client() {
        let store = MemoryDocumentStore::new();
        let (c1, c2, card) = seed(&store).await;
        let assets = ResourceService::new(&store, Collection::Assets);
        let own = assets.create(&staff(), Record::from_api_input(json!({ "name": "A" })).unwrap(), &Scope::tenant(&c1)).await.unwrap();
        let other = assets.create(&staff(), Record::from_api_input(json!({ "name": "B" })).unwrap(), &Scope::tenant(&c2)).await.unwrap();

        let service = JobCardService::new(&store);
        let card_id = card["id"].as_str().unwrap();
        let linked = service
            .create_child(&staff(), card_id, Collection::JobCardAssets, json!({ "assetId": own["id"] }))
            .await
            .unwrap();
        assert_eq!(linked["jobCardId"], json!(card_id));
        assert_eq!(linked["clientId"], json!(c1));

        let err = service
            .create_child(&staff(), card_id, Collection::JobCardAssets, json!({ "assetId": other["id"] }))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn portal_users_comment_on_own_cards_only() {
        let store = MemoryDocumentStore::new();
        let (c1, c2, card) = seed(&store).await;
        let card_id = card["id"].as_str().unwrap();
        let service = JobCardService::new(&store);

        let own = Session { user_id: "p1".into(), role: Role::ClientUser, client_id: Some(c1) };
        let other = Session { user_id: "p2".into(), role: Role::ClientUser, client_id: Some(c2) };

        assert!(service
            .create_child(&own, card_id, Collection::JobCardComments, json!({ "comment": "thanks" }))
            .await
            .is_ok());
        let err = service
            .create_child(&other, card_id, Collection::JobCardComments, json!({ "comment": "hi" }))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err = service
            .create_child(&own, card_id, Collection::JobCardChecklist, json!({ "label": "x" }))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }
}
