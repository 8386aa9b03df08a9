use serde_json::Value;

use super::resource_service::{ListParams, ResourceService, Scope};
use crate::database::{Collection, Document, DocumentStore, Record};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::Page;
use crate::policy::{self, Session};

const TECHNICIAN_ID_FIELD: &str = "technicianId";

/// Staff-managed technicians with their insurance records and tags
pub struct TechnicianService<'a> {
    store: &'a dyn DocumentStore,
    technicians: ResourceService<'a>,
}

impl<'a> TechnicianService<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            technicians: ResourceService::new(store, Collection::Technicians),
        }
    }

    pub fn resources(&self) -> &ResourceService<'a> {
        &self.technicians
    }

    pub async fn create(&self, session: &Session, input: Value) -> Result<Document, ApiError> {
        policy::require_staff(session)?;
        let record = Record::from_api_input(input)?;
        record.require_str("name")?;
        self.technicians.create(session, record, &Scope::root()).await
    }

    async fn child_scope(&self, session: &Session, technician_id: &str) -> Result<Scope, ApiError> {
        policy::require_staff(session)?;
        self.technicians.get(session, technician_id, &Scope::root()).await?;
        Ok(Scope::child(TECHNICIAN_ID_FIELD, technician_id, None))
    }

    pub async fn list_children(
        &self,
        session: &Session,
        technician_id: &str,
        child: Collection,
        params: &ListParams,
    ) -> Result<Page<Document>, ApiError> {
        let scope = self.child_scope(session, technician_id).await?;
        ResourceService::new(self.store, child).list(session, params, &scope).await
    }

    pub async fn add_insurance(&self, session: &Session, technician_id: &str, input: Value) -> Result<Document, ApiError> {
        let scope = self.child_scope(session, technician_id).await?;
        let record = Record::from_api_input(input)?;
        record.validate_required_fields(&["provider", "policyNumber"])?;
        ResourceService::new(self.store, Collection::TechnicianInsurance)
            .create(session, record, &scope)
            .await
    }

    /// Assigning a tag the technician already carries is a conflict
    pub async fn add_tag(&self, session: &Session, technician_id: &str, input: Value) -> Result<Document, ApiError> {
        let scope = self.child_scope(session, technician_id).await?;
        let record = Record::from_api_input(input)?;
        let tag = record.require_str("tag")?;

        let mut existing = Filter::new();
        existing.where_eq(TECHNICIAN_ID_FIELD, technician_id).where_eq("tag", tag.as_str());
        if self.store.count(Collection::TechnicianTags, &existing).await? > 0 {
            return Err(ApiError::conflict(format!("Tag '{}' is already assigned", tag)));
        }

        ResourceService::new(self.store, Collection::TechnicianTags)
            .create(session, record, &scope)
            .await
    }

    pub async fn delete_child(
        &self,
        session: &Session,
        technician_id: &str,
        child: Collection,
        child_id: &str,
    ) -> Result<Document, ApiError> {
        let scope = self.child_scope(session, technician_id).await?;
        ResourceService::new(self.store, child).delete(session, child_id, &scope).await
    }
}
