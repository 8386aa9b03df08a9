//! Policy-checked CRUD over one collection.
//!
//! Every operation authorizes through [`policy::authorize`] before it
//! touches the store. Nested routes pass a [`Scope`] carrying the parent
//! links, which are forced onto created records and checked on reads.

use serde::Deserialize;
use serde_json::Value;

use crate::config;
use crate::database::record::{deleted_changes, doc_str, restored_changes};
use crate::database::{Collection, Document, DocumentStore, Record};
use crate::error::ApiError;
use crate::filter::{matcher, Filter};
use crate::middleware::Page;
use crate::policy::{self, Session};
use crate::types::Operation;

const DEFAULT_ORDER: &str = "createdAt desc";

/// Query string accepted by every list endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub status: Option<i64>,
    /// JSON where document, e.g. `{"name":{"$ilike":"%farm%"}}`
    #[serde(rename = "where")]
    pub where_json: Option<String>,
}

impl ListParams {
    /// Build the caller's filter with paging applied; returns `(filter, page, limit)`
    pub fn to_filter(&self) -> Result<(Filter, i64, i64), ApiError> {
        let mut filter = Filter::new();
        if let Some(raw) = &self.where_json {
            let conditions: Value = serde_json::from_str(raw)
                .map_err(|e| ApiError::invalid_field("where", e.to_string()))?;
            filter.where_clause(conditions)?;
        }
        if let Some(status) = self.status {
            filter.where_eq("status", status);
        }

        match &self.sort {
            Some(sort) => filter.order(Value::String(sort.clone()))?,
            None => filter.default_order(DEFAULT_ORDER)?,
        };

        let limit = config::config().page_size(self.limit);
        let page = self.page.unwrap_or(1).max(1);
        let offset = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| ApiError::invalid_field("page", "Page is out of range"))?;
        filter.limit(limit, Some(offset))?;
        Ok((filter, page, limit))
    }
}

/// Where a nested resource lives: the owning tenant and the parent links
/// every record in this scope must carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    tenant_id: Option<String>,
    links: Vec<(&'static str, String)>,
}

impl Scope {
    /// Top-level collection routes
    pub fn root() -> Self {
        Self::default()
    }

    /// Records owned directly by a client, e.g. `/api/clients/:id/sites`
    pub fn tenant(client_id: impl Into<String>) -> Self {
        let client_id = client_id.into();
        Self {
            links: vec![(policy::CLIENT_ID_FIELD, client_id.clone())],
            tenant_id: Some(client_id),
        }
    }

    /// Child rows of a parent record; `client_id` is the parent's tenant
    pub fn child(parent_field: &'static str, parent_id: impl Into<String>, client_id: Option<String>) -> Self {
        let mut links = vec![(parent_field, parent_id.into())];
        if let Some(client_id) = &client_id {
            links.push((policy::CLIENT_ID_FIELD, client_id.clone()));
        }
        Self { tenant_id: client_id, links }
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    fn contains(&self, doc: &Document) -> bool {
        self.links.iter().all(|(field, value)| doc_str(doc, field) == Some(value.as_str()))
    }
}

pub struct ResourceService<'a> {
    store: &'a dyn DocumentStore,
    collection: Collection,
}

impl<'a> ResourceService<'a> {
    pub fn new(store: &'a dyn DocumentStore, collection: Collection) -> Self {
        Self { store, collection }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Tenant owning `doc`. A tenant-scoped document without the field
    /// yields an empty id, which no portal session matches.
    pub fn record_tenant(&self, doc: &Document) -> Option<String> {
        self.collection
            .tenant_field()
            .map(|field| doc_str(doc, field).unwrap_or_default().to_string())
    }

    pub async fn list(&self, session: &Session, params: &ListParams, scope: &Scope) -> Result<Page<Document>, ApiError> {
        let (filter, page, limit) = params.to_filter()?;
        self.list_filtered(session, filter, scope, page, limit).await
    }

    pub async fn list_filtered(
        &self,
        session: &Session,
        mut filter: Filter,
        scope: &Scope,
        page: i64,
        limit: i64,
    ) -> Result<Page<Document>, ApiError> {
        policy::authorize(session, self.collection, scope.tenant_id(), Operation::Select)?;

        for (field, value) in &scope.links {
            filter.where_eq(field, value.as_str());
        }
        if let (None, Some(tenant_field)) = (scope.tenant_id(), self.collection.tenant_field()) {
            filter = policy::scope_list_query_on(session, filter, tenant_field)?;
        }

        let total = self.store.count(self.collection, &filter).await?;
        let docs = self.store.find(self.collection, &filter).await?;
        Ok(Page::new(docs, total, page, limit))
    }

    /// Non-deleted document by id, without any policy check
    pub async fn fetch(&self, id: &str) -> Result<Document, ApiError> {
        match self.store.get(self.collection, id).await? {
            Some(doc) if !matcher::is_deleted(&doc) => Ok(doc),
            _ => Err(self.not_found()),
        }
    }

    pub async fn get(&self, session: &Session, id: &str, scope: &Scope) -> Result<Document, ApiError> {
        let doc = self.fetch(id).await?;
        self.check(session, &doc, scope, Operation::Select)?;
        Ok(doc)
    }

    /// Authorize a create, force the scope links onto the record and stamp
    /// the system fields. The caller inserts it.
    pub fn prepare_create(&self, session: &Session, mut record: Record, scope: &Scope) -> Result<Record, ApiError> {
        for (field, value) in &scope.links {
            record.set(*field, value.as_str());
        }

        let tenant_id = match scope.tenant_id() {
            Some(tenant_id) => Some(tenant_id.to_string()),
            None if self.collection == Collection::Clients => None,
            None => match self.collection.tenant_field() {
                Some(field) => Some(record.require_str(field)?),
                None => None,
            },
        };
        policy::authorize(session, self.collection, tenant_id.as_deref(), Operation::Create)?;

        record.stamp_new(&session.user_id);
        Ok(record)
    }

    pub async fn create(&self, session: &Session, record: Record, scope: &Scope) -> Result<Document, ApiError> {
        let record = self.prepare_create(session, record, scope)?;
        Ok(self.store.insert(self.collection, record.into_document()).await?)
    }

    /// Fetch and authorize the target of an update; returns the current document
    pub async fn prepare_update(&self, session: &Session, id: &str, scope: &Scope) -> Result<Document, ApiError> {
        let doc = self.fetch(id).await?;
        self.check(session, &doc, scope, Operation::Update)?;
        Ok(doc)
    }

    pub async fn update(&self, session: &Session, id: &str, mut record: Record, scope: &Scope) -> Result<Document, ApiError> {
        self.prepare_update(session, id, scope).await?;
        if record.is_empty() {
            return Err(ApiError::validation("No fields to update"));
        }
        record.touch_updated_at();
        Ok(self.store.update(self.collection, id, record.into_document()).await?)
    }

    /// Soft delete: the document stays, with `status = 2`
    pub async fn delete(&self, session: &Session, id: &str, scope: &Scope) -> Result<Document, ApiError> {
        let doc = self.fetch(id).await?;
        self.check(session, &doc, scope, Operation::Delete)?;
        let deleted = self.store.update(self.collection, id, deleted_changes()).await?;
        tracing::info!(user_id = %session.user_id, "Soft-deleted {} {}", self.collection, id);
        Ok(deleted)
    }

    pub async fn restore(&self, session: &Session, id: &str, scope: &Scope) -> Result<Document, ApiError> {
        let doc = self
            .store
            .get(self.collection, id)
            .await?
            .ok_or_else(|| self.not_found())?;
        self.check(session, &doc, scope, Operation::Restore)?;

        if !matcher::is_deleted(&doc) {
            return Ok(doc);
        }
        let restored = self.store.update(self.collection, id, restored_changes()).await?;
        tracing::info!(user_id = %session.user_id, "Restored {} {}", self.collection, id);
        Ok(restored)
    }

    /// Tenant check against the record itself, then scope membership.
    /// A record outside the requested scope is reported as missing.
    fn check(&self, session: &Session, doc: &Document, scope: &Scope, operation: Operation) -> Result<(), ApiError> {
        let tenant_id = self.record_tenant(doc);
        policy::authorize(session, self.collection, tenant_id.as_deref(), operation)?;
        if !scope.contains(doc) {
            return Err(self.not_found());
        }
        Ok(())
    }

    pub fn not_found(&self) -> ApiError {
        ApiError::not_found(format!("{} not found", self.collection.label()))
    }
}
