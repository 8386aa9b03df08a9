//! Unauthenticated portal. Every operation first resolves its credential (a
//! tenant access token or a record unique id) and only then reads data.

use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use super::ticket_service::{reject_staff_only_fields, TicketService, TicketView, PUBLIC_AUTHOR};
use crate::api::format::{pick, present_public};
use crate::config;
use crate::database::record::doc_str;
use crate::database::{Collection, Document, DocumentStore, Record, Write};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::policy::public::{resolve_public_record, resolve_public_token, PublicRecordKind};
use crate::types::RecordStatus;

const CLIENT_SUMMARY_FIELDS: &[&str] = &["name", "logoUrl"];
const SITE_SUMMARY_FIELDS: &[&str] = &["id", "name", "address"];
const ASSET_SUMMARY_FIELDS: &[&str] = &["uniqueId", "name", "assetType", "make", "model", "serialNumber", "location"];
const JOB_CARD_SUMMARY_FIELDS: &[&str] = &["uniqueId", "title", "jobStatus", "scheduledDate", "createdAt"];

/// Checklist progress submitted from a public job card link
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JobCardProgress {
    #[serde(default)]
    #[validate(nested)]
    pub checklist: Vec<ChecklistItemProgress>,
    #[validate(length(max = 10000, message = "Notes are too long"))]
    pub technician_notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItemProgress {
    #[validate(length(min = 1, message = "Checklist item id is required"))]
    pub id: String,
    pub completed: bool,
    #[validate(length(max = 2000, message = "Notes are too long"))]
    pub notes: Option<String>,
}

pub struct PublicService<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> PublicService<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Tenant name and active sites for the support page
    pub async fn support_info(&self, access_token: &str) -> Result<Value, ApiError> {
        let client = resolve_public_token(self.store, access_token).await?;
        let sites = self.active_sites(&client).await?;
        Ok(json!({
            "client": pick(&client, CLIENT_SUMMARY_FIELDS),
            "sites": sites.iter().map(|s| pick(s, SITE_SUMMARY_FIELDS)).collect::<Vec<_>>(),
        }))
    }

    pub async fn create_ticket(&self, access_token: &str, input: Value) -> Result<TicketView, ApiError> {
        let client = resolve_public_token(self.store, access_token).await?;
        let client_id = doc_str(&client, "id").unwrap_or_default();
        let record = Record::from_update_input(input)?;
        reject_staff_only_fields(&record)?;
        TicketService::new(self.store)
            .create_for_client(client_id, record, PUBLIC_AUTHOR)
            .await
    }

    pub async fn asset_summary(&self, unique_id: &str) -> Result<Value, ApiError> {
        let asset = resolve_public_record(self.store, unique_id, PublicRecordKind::Asset).await?;
        Ok(pick(&asset, ASSET_SUMMARY_FIELDS))
    }

    /// Append a maintenance log to the asset behind `unique_id`
    pub async fn log_maintenance(&self, unique_id: &str, input: Value) -> Result<Value, ApiError> {
        let asset = resolve_public_record(self.store, unique_id, PublicRecordKind::Asset).await?;
        let mut record = Record::from_update_input(input)?;
        record.require_str("description")?;

        for field in ["id", "clientId", "siteId"] {
            let target = if field == "id" { "assetId" } else { field };
            if let Some(value) = doc_str(&asset, field) {
                record.set(target, value);
            }
        }
        record.stamp_new(PUBLIC_AUTHOR);

        let log = self.store.insert(Collection::MaintenanceLogs, record.into_document()).await?;
        tracing::info!("Public maintenance log {} for asset {}", log["id"], asset["id"]);
        Ok(present_public(log))
    }

    pub async fn asset_detail(&self, unique_id: &str) -> Result<Value, ApiError> {
        let asset = resolve_public_record(self.store, unique_id, PublicRecordKind::Asset).await?;
        Ok(present_public(asset))
    }

    /// Maintenance logs for one asset plus the job cards it was linked to
    pub async fn asset_history(&self, unique_id: &str) -> Result<Value, ApiError> {
        let asset = resolve_public_record(self.store, unique_id, PublicRecordKind::Asset).await?;
        let asset_id = doc_str(&asset, "id").unwrap_or_default();
        let max = config::config().api.max_page_size;

        let mut logs = Filter::new();
        logs.where_eq("assetId", asset_id).order(json!("createdAt desc"))?.limit(max, None)?;
        let logs = self.store.find(Collection::MaintenanceLogs, &logs).await?;

        let mut links = Filter::new();
        links.where_eq("assetId", asset_id).limit(max, None)?;
        let card_ids: Vec<Value> = self
            .store
            .find(Collection::JobCardAssets, &links)
            .await?
            .iter()
            .filter_map(|link| link.get("jobCardId").cloned())
            .collect();

        let cards = if card_ids.is_empty() {
            Vec::new()
        } else {
            let mut cards = Filter::new();
            cards.where_clause(json!({ "id": { "$in": card_ids } }))?.order(json!("createdAt desc"))?;
            self.store.find(Collection::JobCards, &cards).await?
        };

        Ok(json!({
            "asset": pick(&asset, ASSET_SUMMARY_FIELDS),
            "maintenanceLogs": logs.into_iter().map(present_public).collect::<Vec<_>>(),
            "jobCards": cards.iter().map(|c| pick(c, JOB_CARD_SUMMARY_FIELDS)).collect::<Vec<_>>(),
        }))
    }

    pub async fn job_card(&self, unique_id: &str) -> Result<Value, ApiError> {
        let card = resolve_public_record(self.store, unique_id, PublicRecordKind::JobCard).await?;
        let checklist = self.checklist(&card).await?;
        Ok(json!({
            "jobCard": present_public(card),
            "checklist": checklist.into_iter().map(present_public).collect::<Vec<_>>(),
        }))
    }

    /// Record checklist completion and technician notes. Only items of this
    /// job card can be touched; all changes are written together.
    pub async fn update_job_card(&self, unique_id: &str, progress: JobCardProgress) -> Result<Value, ApiError> {
        progress.validate()?;
        let card = resolve_public_record(self.store, unique_id, PublicRecordKind::JobCard).await?;
        let card_id = doc_str(&card, "id").unwrap_or_default().to_string();

        let mut writes = Vec::with_capacity(progress.checklist.len() + 1);
        for item in &progress.checklist {
            let stored = self.store.get(Collection::JobCardChecklist, &item.id).await?;
            let belongs = stored.as_ref().is_some_and(|doc| {
                doc_str(doc, "jobCardId") == Some(card_id.as_str())
                    && doc.get(RecordStatus::FIELD) != Some(&json!(RecordStatus::Deleted.code()))
            });
            if !belongs {
                return Err(ApiError::invalid_field("checklist", format!("Unknown checklist item {}", item.id)));
            }

            let mut changes = Record::new();
            changes.set("completed", item.completed).set("updatedBy", PUBLIC_AUTHOR);
            if let Some(notes) = &item.notes {
                changes.set("notes", notes.as_str());
            }
            changes.touch_updated_at();
            writes.push(Write::update(Collection::JobCardChecklist, item.id.as_str(), changes.into_document()));
        }
        if let Some(notes) = &progress.technician_notes {
            let mut changes = Record::new();
            changes.set("technicianNotes", notes.as_str()).touch_updated_at();
            writes.push(Write::update(Collection::JobCards, card_id.as_str(), changes.into_document()));
        }
        if writes.is_empty() {
            return Err(ApiError::validation("No changes submitted"));
        }

        self.store.apply_batch(writes).await?;
        tracing::info!("Public progress update on job card {}", card_id);
        self.job_card(unique_id).await
    }

    async fn active_sites(&self, client: &Document) -> Result<Vec<Document>, ApiError> {
        let mut filter = Filter::new();
        filter
            .where_eq("clientId", doc_str(client, "id").unwrap_or_default())
            .where_eq(RecordStatus::FIELD, RecordStatus::Active.code())
            .order(json!("name asc"))?
            .limit(config::config().api.max_page_size, None)?;
        Ok(self.store.find(Collection::Sites, &filter).await?)
    }

    async fn checklist(&self, card: &Document) -> Result<Vec<Document>, ApiError> {
        let mut filter = Filter::new();
        filter
            .where_eq("jobCardId", doc_str(card, "id").unwrap_or_default())
            .order(json!("createdAt asc"))?
            .limit(config::config().api.max_page_size, None)?;
        Ok(self.store.find(Collection::JobCardChecklist, &filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Session;
    use crate::services::client_service::ClientService;
    use crate::services::job_card_service::JobCardService;
    use crate::services::resource_service::{ResourceService, Scope};
    use crate::database::MemoryDocumentStore;
    use crate::types::Role;
    use axum::http::StatusCode;

    fn staff() -> Session {
        Session { user_id: "admin".into(), role: Role::Admin, client_id: None }
    }

    async fn client(store: &MemoryDocumentStore) -> Document {
        ClientService::new(store).create(&staff(), json!({ "name": "Acme" })).await.unwrap()
    }

    #[tokio::test]
    async fn support_page_shows_active_sites_only() {
        let store = MemoryDocumentStore::new();
        let client = client(&store).await;
        let token = client["accessToken"].as_str().unwrap();
        let scope = Scope::tenant(client["id"].as_str().unwrap());
        let sites = ResourceService::new(&store, Collection::Sites);
        sites.create(&staff(), Record::from_api_input(json!({ "name": "North" })).unwrap(), &scope).await.unwrap();
        let south = sites.create(&staff(), Record::from_api_input(json!({ "name": "South" })).unwrap(), &scope).await.unwrap();
        sites.delete(&staff(), south["id"].as_str().unwrap(), &scope).await.unwrap();

        let info = PublicService::new(&store).support_info(token).await.unwrap();
        assert_eq!(info["client"], json!({ "name": "Acme" }));
        assert_eq!(info["sites"].as_array().unwrap().len(), 1);

        let view = PublicService::new(&store)
            .create_ticket(token, json!({ "title": "Broken pump", "description": "No pressure" }))
            .await
            .unwrap();
        assert_eq!(view.ticket["clientId"], client["id"]);
        assert_eq!(view.ticket["createdBy"], json!("public"));
    }

    #[tokio::test]
    async fn public_ticket_cannot_target_another_tenant() {
        let store = MemoryDocumentStore::new();
        let client = client(&store).await;
        let token = client["accessToken"].as_str().unwrap();

        let err = PublicService::new(&store)
            .create_ticket(token, json!({ "title": "x", "clientId": "other" }))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn public_ticket_always_starts_open() {
        let store = MemoryDocumentStore::new();
        let client = client(&store).await;
        let token = client["accessToken"].as_str().unwrap();
        let service = PublicService::new(&store);

        for input in [json!({ "title": "x", "ticketStatus": 5 }), json!({ "title": "x", "status": 0 })] {
            let err = service.create_ticket(token, input).await.unwrap_err();
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
        let view = service.create_ticket(token, json!({ "title": "x" })).await.unwrap();
        assert_eq!(view.ticket["ticketStatus"], json!(1));
        assert_eq!(view.ticket["status"], json!(1));
    }

    #[tokio::test]
    async fn maintenance_log_is_attached_to_the_asset() {
        let store = MemoryDocumentStore::new();
        let client = client(&store).await;
        let client_id = client["id"].as_str().unwrap();
        let asset = ResourceService::new(&store, Collection::Assets)
            .create(&staff(), Record::from_api_input(json!({ "name": "Pump" })).unwrap(), &Scope::tenant(client_id))
            .await
            .unwrap();
        let mut changes = Record::new();
        changes.set("uniqueId", "asset-link-1");
        store.update(Collection::Assets, asset["id"].as_str().unwrap(), changes.into_document()).await.unwrap();

        let public = PublicService::new(&store);
        let log = public.log_maintenance("asset-link-1", json!({ "description": "Filter changed" })).await.unwrap();
        assert_eq!(log["assetId"], asset["id"]);
        assert_eq!(log["clientId"], json!(client_id));
        assert!(log.get("createdBy").is_none());

        let history = public.asset_history("asset-link-1").await.unwrap();
        assert_eq!(history["maintenanceLogs"].as_array().unwrap().len(), 1);
        assert_eq!(history["jobCards"], json!([]));

        let err = public.log_maintenance("unknown-link", json!({ "description": "x" })).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn job_card_progress_touches_only_its_own_checklist() {
        let store = MemoryDocumentStore::new();
        let client = client(&store).await;
        let client_id = client["id"].as_str().unwrap();
        let cards = JobCardService::new(&store);
        let card = cards.create(&staff(), json!({ "clientId": client_id })).await.unwrap();
        let other = cards.create(&staff(), json!({ "clientId": client_id })).await.unwrap();

        let item = cards
            .create_child(&staff(), card["id"].as_str().unwrap(), Collection::JobCardChecklist, json!({ "label": "Flush" }))
            .await
            .unwrap();
        let foreign = cards
            .create_child(&staff(), other["id"].as_str().unwrap(), Collection::JobCardChecklist, json!({ "label": "Flush" }))
            .await
            .unwrap();

        let public = PublicService::new(&store);
        let unique_id = card["uniqueId"].as_str().unwrap();
        let progress = |id: &Value| JobCardProgress {
            checklist: vec![ChecklistItemProgress { id: id.as_str().unwrap().into(), completed: true, notes: None }],
            technician_notes: Some("Done".into()),
        };

        let err = public.update_job_card(unique_id, progress(&foreign["id"])).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(store.get(Collection::JobCards, card["id"].as_str().unwrap()).await.unwrap().unwrap().get("technicianNotes").is_none());

        let view = public.update_job_card(unique_id, progress(&item["id"])).await.unwrap();
        assert_eq!(view["jobCard"]["technicianNotes"], json!("Done"));
        assert_eq!(view["checklist"][0]["completed"], json!(true));
    }
}
