use serde_json::Value;

use crate::database::record::now_timestamp;
use crate::database::{Collection, Document, DocumentStore, Record};
use crate::error::ApiError;
use crate::policy::{self, Session};
use crate::types::Operation;

/// Application settings live in one document
const SETTINGS_ID: &str = "global";

pub struct SettingsService<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> SettingsService<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Empty settings until the first save
    pub async fn get(&self, session: &Session) -> Result<Document, ApiError> {
        policy::authorize(session, Collection::Settings, None, Operation::Select)?;
        let settings = self.store.get(Collection::Settings, SETTINGS_ID).await?;
        Ok(settings.unwrap_or_default())
    }

    /// Merge `input` into the stored settings, creating them if needed
    pub async fn update(&self, session: &Session, input: Value) -> Result<Document, ApiError> {
        policy::authorize(session, Collection::Settings, None, Operation::Update)?;
        let mut record = Record::from_api_input(input)?;
        if record.is_empty() {
            return Err(ApiError::validation("No settings to update"));
        }
        record.set("updatedBy", session.user_id.as_str()).touch_updated_at();

        let saved = match self.store.get(Collection::Settings, SETTINGS_ID).await? {
            Some(_) => self.store.update(Collection::Settings, SETTINGS_ID, record.into_document()).await?,
            None => {
                let mut doc = record.into_document();
                doc.insert("id".into(), SETTINGS_ID.into());
                doc.insert("createdAt".into(), now_timestamp().into());
                self.store.insert(Collection::Settings, doc).await?
            }
        };
        tracing::info!(user_id = %session.user_id, "Updated settings");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDocumentStore;
    use crate::types::Role;
    use serde_json::json;

    #[tokio::test]
    async fn settings_merge_and_are_staff_writable() {
        let store = MemoryDocumentStore::new();
        let settings = SettingsService::new(&store);
        let staff = Session { user_id: "admin".into(), role: Role::Admin, client_id: None };
        let portal = Session { user_id: "p".into(), role: Role::ClientUser, client_id: Some("C1".into()) };

        assert!(settings.get(&portal).await.unwrap().is_empty());
        settings.update(&staff, json!({ "companyName": "TSC", "currency": "AUD" })).await.unwrap();
        settings.update(&staff, json!({ "currency": "NZD" })).await.unwrap();

        let current = settings.get(&portal).await.unwrap();
        assert_eq!(current["companyName"], json!("TSC"));
        assert_eq!(current["currency"], json!("NZD"));
        assert!(settings.update(&portal, json!({ "currency": "USD" })).await.is_err());
    }
}
