//! Support tickets. A ticket is stored as three kinds of documents: the
//! ticket itself, one detail record and an append-only log. Writes that
//! touch more than one of them go through a single store batch.

use serde::Serialize;
use serde_json::{json, Value};

use super::resource_service::{ListParams, ResourceService, Scope};
use crate::database::record::{doc_str, read_code};
use crate::database::{Collection, Document, DocumentStore, Record, Write};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::Page;
use crate::policy::{self, Session};
use crate::types::{Operation, RecordStatus, TicketStatus};

const TICKET_ID_FIELD: &str = "ticketId";

/// Ticket fields moved onto the detail record at creation
const DETAIL_FIELDS: &[&str] = &["description", "contactName", "contactEmail", "contactPhone"];

/// Only staff choose the initial workflow or lifecycle state of a ticket
const STAFF_ONLY_ON_CREATE: &[&str] = &[TicketStatus::FIELD, RecordStatus::FIELD];

/// `createdBy` for tickets raised through the public support page
pub const PUBLIC_AUTHOR: &str = "public";

/// A ticket with its detail record and log
#[derive(Debug, Clone, Serialize)]
pub struct TicketView {
    pub ticket: Document,
    pub detail: Option<Document>,
    pub logs: Vec<Document>,
}

pub struct TicketService<'a> {
    store: &'a dyn DocumentStore,
    tickets: ResourceService<'a>,
}

impl<'a> TicketService<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            tickets: ResourceService::new(store, Collection::SupportTickets),
        }
    }

    pub fn resources(&self) -> &ResourceService<'a> {
        &self.tickets
    }

    /// Portal users raise tickets for their own tenant; staff name the client
    pub async fn create(&self, session: &Session, input: Value) -> Result<TicketView, ApiError> {
        let mut record = Record::from_api_input(input)?;
        if session.role.is_client_portal() {
            if let Some(client_id) = session.client_id.as_deref() {
                record.set_if_empty("clientId", client_id);
            }
        }
        if !session.role.is_staff() {
            reject_staff_only_fields(&record)?;
        }
        let client_id = record.require_str("clientId")?;
        policy::authorize(session, Collection::SupportTickets, Some(&client_id), Operation::Create)?;

        ResourceService::new(self.store, Collection::Clients)
            .fetch(&client_id)
            .await
            .map_err(|_| ApiError::invalid_field("clientId", "Client not found"))?;

        self.create_for_client(&client_id, record, &session.user_id).await
    }

    /// Write ticket, detail and `created` log entry as one batch. The caller
    /// has already resolved and authorized `client_id`.
    pub async fn create_for_client(&self, client_id: &str, mut record: Record, author: &str) -> Result<TicketView, ApiError> {
        record.require_str("title")?;
        record.read_code::<TicketStatus>(TicketStatus::FIELD)?;
        if let Some(site_id) = record.get_str("siteId").map(str::to_string) {
            self.check_site(client_id, &site_id).await?;
        }

        record
            .set("clientId", client_id)
            .set_if_empty(TicketStatus::FIELD, TicketStatus::Open.code())
            .stamp_new(author);

        let mut detail = Record::new();
        for field in DETAIL_FIELDS {
            if let Some(value) = record.remove(field) {
                detail.set(*field, value);
            }
        }
        let ticket = record.into_document();
        let ticket_id = doc_str(&ticket, "id").unwrap_or_default().to_string();

        detail
            .set(TICKET_ID_FIELD, ticket_id.as_str())
            .set("clientId", client_id)
            .stamp_new(author);

        let log = log_entry(&ticket_id, client_id, author, "created", json!({ "ticketStatus": ticket[TicketStatus::FIELD] }));

        let mut written = self
            .store
            .apply_batch(vec![
                Write::insert(Collection::SupportTickets, ticket),
                Write::insert(Collection::TicketDetails, detail.into_document()),
                Write::insert(Collection::TicketLogs, log),
            ])
            .await?
            .into_iter();

        tracing::info!(author = %author, "Created support ticket {} for client {}", ticket_id, client_id);
        let ticket = written.next().unwrap_or_default();
        let detail = written.next();
        Ok(TicketView { ticket, detail, logs: written.collect() })
    }

    pub async fn get(&self, session: &Session, id: &str) -> Result<TicketView, ApiError> {
        let ticket = self.tickets.get(session, id, &Scope::root()).await?;
        self.view(ticket).await
    }

    async fn view(&self, ticket: Document) -> Result<TicketView, ApiError> {
        let ticket_id = doc_str(&ticket, "id").unwrap_or_default();

        let mut by_ticket = Filter::new();
        by_ticket.where_eq(TICKET_ID_FIELD, ticket_id);
        let detail = self.store.find_one(Collection::TicketDetails, &by_ticket).await?;

        by_ticket.order(json!("createdAt asc"))?;
        let logs = self.store.find(Collection::TicketLogs, &by_ticket).await?;

        Ok(TicketView { ticket, detail, logs })
    }

    /// Staff update. A `ticketStatus` change is logged in the same batch.
    pub async fn update(&self, session: &Session, id: &str, input: Value) -> Result<Document, ApiError> {
        let mut record = Record::from_update_input(input)?;
        if record.is_empty() {
            return Err(ApiError::validation("No fields to update"));
        }
        let new_status = record.read_code::<TicketStatus>(TicketStatus::FIELD)?;

        let current = self.tickets.prepare_update(session, id, &Scope::root()).await?;
        let old_status = read_code::<TicketStatus>(&current, TicketStatus::FIELD)?;
        record.touch_updated_at();

        let mut writes = vec![Write::update(Collection::SupportTickets, id, record.into_document())];
        if let Some(new_status) = new_status.filter(|s| Some(*s) != old_status) {
            let client_id = doc_str(&current, "clientId").unwrap_or_default();
            writes.push(Write::insert(
                Collection::TicketLogs,
                log_entry(
                    id,
                    client_id,
                    &session.user_id,
                    "status_changed",
                    json!({ "from": old_status.map(|s| s.code()), "to": new_status.code() }),
                ),
            ));
            tracing::info!(user_id = %session.user_id, "Ticket {} status {:?} -> {:?}", id, old_status, new_status);
        }

        let written = self.store.apply_batch(writes).await?;
        written.into_iter().next().ok_or_else(|| ApiError::internal("Ticket update returned no document"))
    }

    pub async fn child_scope(&self, session: &Session, ticket_id: &str) -> Result<Scope, ApiError> {
        let ticket = self.tickets.get(session, ticket_id, &Scope::root()).await?;
        let client_id = doc_str(&ticket, "clientId").map(str::to_string);
        Ok(Scope::child(TICKET_ID_FIELD, ticket_id, client_id))
    }

    pub async fn list_children(
        &self,
        session: &Session,
        ticket_id: &str,
        child: Collection,
        params: &ListParams,
    ) -> Result<Page<Document>, ApiError> {
        let scope = self.child_scope(session, ticket_id).await?;
        ResourceService::new(self.store, child).list(session, params, &scope).await
    }

    pub async fn create_child(
        &self,
        session: &Session,
        ticket_id: &str,
        child: Collection,
        input: Value,
    ) -> Result<Document, ApiError> {
        let scope = self.child_scope(session, ticket_id).await?;
        let record = Record::from_api_input(input)?;
        match child {
            Collection::TicketComments => {
                record.require_str("comment")?;
            }
            // Metadata only; the file itself lives elsewhere
            Collection::TicketAttachments => record.validate_required_fields(&["fileName", "url"])?,
            Collection::TicketTime => {
                let minutes = record.get("minutes").and_then(Value::as_i64);
                if !minutes.is_some_and(|m| m > 0) {
                    return Err(ApiError::invalid_field("minutes", "Must be a positive integer"));
                }
            }
            Collection::TicketTechnicians => {
                let technician_id = record.require_str("technicianId")?;
                ResourceService::new(self.store, Collection::Technicians)
                    .fetch(&technician_id)
                    .await
                    .map_err(|_| ApiError::invalid_field("technicianId", "Technician not found"))?;
            }
            _ => {}
        }
        ResourceService::new(self.store, child).create(session, record, &scope).await
    }

    pub async fn update_child(
        &self,
        session: &Session,
        ticket_id: &str,
        child: Collection,
        child_id: &str,
        input: Value,
    ) -> Result<Document, ApiError> {
        let scope = self.child_scope(session, ticket_id).await?;
        let record = Record::from_update_input(input)?;
        ResourceService::new(self.store, child).update(session, child_id, record, &scope).await
    }

    pub async fn delete_child(
        &self,
        session: &Session,
        ticket_id: &str,
        child: Collection,
        child_id: &str,
    ) -> Result<Document, ApiError> {
        let scope = self.child_scope(session, ticket_id).await?;
        ResourceService::new(self.store, child).delete(session, child_id, &scope).await
    }

    async fn check_site(&self, client_id: &str, site_id: &str) -> Result<(), ApiError> {
        let site = ResourceService::new(self.store, Collection::Sites)
            .fetch(site_id)
            .await
            .map_err(|_| ApiError::invalid_field("siteId", "Site not found"))?;
        if doc_str(&site, "clientId") != Some(client_id) {
            return Err(ApiError::invalid_field("siteId", "Site not found"));
        }
        Ok(())
    }
}

/// Tickets raised by portal users or the public support page always start
/// Active and Open
pub(crate) fn reject_staff_only_fields(record: &Record) -> Result<(), ApiError> {
    match STAFF_ONLY_ON_CREATE.iter().find(|field| record.contains(field)) {
        Some(field) => Err(ApiError::invalid_field(*field, "Only staff can set this field")),
        None => Ok(()),
    }
}

fn log_entry(ticket_id: &str, client_id: &str, author: &str, action: &str, details: Value) -> Document {
    let mut log = Record::new();
    log.set(TICKET_ID_FIELD, ticket_id)
        .set("clientId", client_id)
        .set("action", action)
        .set("details", details)
        .stamp_new(author);
    log.into_document()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDocumentStore;
    use crate::services::client_service::ClientService;
    use crate::types::Role;
    use axum::http::StatusCode;

    fn staff() -> Session {
        Session { user_id: "admin".into(), role: Role::Admin, client_id: None }
    }

    async fn client(store: &MemoryDocumentStore) -> String {
        let client = ClientService::new(store).create(&staff(), json!({ "name": "Acme" })).await.unwrap();
        client["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn create_writes_ticket_detail_and_log() {
        let store = MemoryDocumentStore::new();
        let client_id = client(&store).await;
        let portal = Session { user_id: "p".into(), role: Role::ClientUser, client_id: Some(client_id.clone()) };

        let view = TicketService::new(&store)
            .create(&portal, json!({ "title": "Leak", "description": "Nozzle drips" }))
            .await
            .unwrap();

        assert_eq!(view.ticket["clientId"], json!(client_id));
        assert_eq!(view.ticket["ticketStatus"], json!(1));
        assert!(view.ticket.get("description").is_none());
        let detail = view.detail.unwrap();
        assert_eq!(detail["description"], json!("Nozzle drips"));
        assert_eq!(detail["ticketId"], view.ticket["id"]);
        assert_eq!(view.logs.len(), 1);
        assert_eq!(view.logs[0]["action"], json!("created"));
    }

    #[tokio::test]
    async fn portal_users_cannot_raise_tickets_for_other_tenants() {
        let store = MemoryDocumentStore::new();
        let other = client(&store).await;
        let portal = Session { user_id: "p".into(), role: Role::ClientAdmin, client_id: Some("C1".into()) };

        let err = TicketService::new(&store)
            .create(&portal, json!({ "title": "x", "clientId": other }))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(store.count(Collection::SupportTickets, &Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn only_staff_choose_the_initial_status() {
        let store = MemoryDocumentStore::new();
        let client_id = client(&store).await;
        let service = TicketService::new(&store);
        let portal = Session { user_id: "p".into(), role: Role::ClientUser, client_id: Some(client_id.clone()) };

        for input in [json!({ "title": "x", "ticketStatus": 6 }), json!({ "title": "x", "status": 0 })] {
            let err = service.create(&portal, input).await.unwrap_err();
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(store.count(Collection::SupportTickets, &Filter::new()).await.unwrap(), 0);

        let view = service
            .create(&staff(), json!({ "title": "x", "clientId": client_id, "ticketStatus": 6 }))
            .await
            .unwrap();
        assert_eq!(view.ticket["ticketStatus"], json!(6));
    }

    #[tokio::test]
    async fn status_change_is_logged() {
        let store = MemoryDocumentStore::new();
        let client_id = client(&store).await;
        let service = TicketService::new(&store);
        let view = service.create(&staff(), json!({ "title": "x", "clientId": client_id })).await.unwrap();
        let id = view.ticket["id"].as_str().unwrap();

        let updated = service.update(&staff(), id, json!({ "ticketStatus": 6 })).await.unwrap();
        assert_eq!(updated["ticketStatus"], json!(6));
        service.update(&staff(), id, json!({ "priority": "high" })).await.unwrap();

        let view = service.get(&staff(), id).await.unwrap();
        let actions: Vec<_> = view.logs.iter().map(|l| l["action"].clone()).collect();
        assert_eq!(actions, vec![json!("created"), json!("status_changed")]);
        assert_eq!(view.logs[1]["details"], json!({ "from": 1, "to": 6 }));

        assert!(service.update(&staff(), id, json!({ "ticketStatus": 9 })).await.is_err());
    }

    #[tokio::test]
    async fn site_must_belong_to_ticket_client() {
        let store = MemoryDocumentStore::new();
        let c1 = client(&store).await;
        let c2 = client(&store).await;
        let site = ResourceService::new(&store, Collection::Sites)
            .create(&staff(), Record::from_api_input(json!({ "name": "S" })).unwrap(), &Scope::tenant(&c2))
            .await
            .unwrap();

        let err = TicketService::new(&store)
            .create(&staff(), json!({ "title": "x", "clientId": c1, "siteId": site["id"] }))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
