use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::types::{RecordStatus, UnknownCode};

/// A stored document: a flat JSON object with camelCase keys
pub type Document = Map<String, Value>;

/// Fields maintained by the server; rejected when present in API input
const SYSTEM_FIELDS: &[&str] = &[
    "id",
    "createdAt",
    "updatedAt",
    "deletedAt",
    "createdBy",
    "uniqueId",
    "accessToken",
    "passwordHash",
];

/// Ownership links; fixed at creation and rejected on update
const OWNERSHIP_FIELDS: &[&str] = &["clientId", "jobCardId", "ticketId", "technicianId"];

/// Errors that can occur while turning API input into a record
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("System field '{0}' cannot be set via API input")]
    SystemFieldNotAllowed(&'static str),
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),
    #[error("Unsupported value for field '{field}': {value}")]
    InvalidCode { field: String, value: i64 },
    #[error("Field '{field}' must be {expected}")]
    InvalidType { field: String, expected: &'static str },
}

/// API input being prepared for a write. Holds only the caller's fields
/// until the service stamps system fields onto it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Document,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create record from API input JSON, rejecting system fields
    pub fn from_api_input(json: Value) -> Result<Self, RecordError> {
        Self::from_input(json, SYSTEM_FIELDS)
    }

    /// Like `from_api_input`, but ownership links cannot be changed either
    pub fn from_update_input(json: Value) -> Result<Self, RecordError> {
        let record = Self::from_input(json, SYSTEM_FIELDS)?;
        if let Some(field) = OWNERSHIP_FIELDS.iter().find(|f| record.fields.contains_key(**f)) {
            return Err(RecordError::SystemFieldNotAllowed(*field));
        }
        Ok(record)
    }

    fn from_input(json: Value, forbidden: &[&'static str]) -> Result<Self, RecordError> {
        let Value::Object(map) = json else {
            return Err(RecordError::InvalidJson("Expected JSON object".to_string()));
        };
        if let Some(field) = forbidden.iter().find(|f| map.contains_key(**f)) {
            return Err(RecordError::SystemFieldNotAllowed(*field));
        }

        let record = Self { fields: map };
        // Lifecycle goes through DELETE / restore, never through a field write
        if let Some(status) = record.read_code::<RecordStatus>(RecordStatus::FIELD)? {
            if status == RecordStatus::Deleted {
                return Err(RecordError::InvalidCode {
                    field: RecordStatus::FIELD.to_string(),
                    value: status.code(),
                });
            }
        }
        Ok(record)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn set_if_empty(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        if self.fields.get(&key).map(Value::is_null).unwrap_or(true) {
            self.fields.insert(key, value.into());
        }
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// A non-empty string field, trimmed
    pub fn require_str(&self, field: &str) -> Result<String, RecordError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Err(RecordError::MissingRequiredField(field.to_string())),
            Some(Value::String(s)) if s.trim().is_empty() => {
                Err(RecordError::MissingRequiredField(field.to_string()))
            }
            Some(Value::String(s)) => Ok(s.trim().to_string()),
            Some(_) => Err(RecordError::InvalidType { field: field.to_string(), expected: "a string" }),
        }
    }

    pub fn validate_required_fields(&self, fields: &[&str]) -> Result<(), RecordError> {
        for field in fields {
            self.require_str(field)?;
        }
        Ok(())
    }

    /// Read an integer-coded enum field, if present
    pub fn read_code<T>(&self, field: &str) -> Result<Option<T>, RecordError>
    where
        T: TryFrom<i64, Error = UnknownCode>,
    {
        read_code(&self.fields, field)
    }

    /// Stamp the fields every new document carries. `status` defaults to
    /// Active unless the caller chose Inactive.
    pub fn stamp_new(&mut self, created_by: &str) -> &mut Self {
        let now = now_timestamp();
        self.fields.insert("id".to_string(), Value::String(new_id()));
        self.set_if_empty(RecordStatus::FIELD, RecordStatus::Active.code());
        self.fields.insert("createdAt".to_string(), Value::String(now.clone()));
        self.fields.insert("updatedAt".to_string(), Value::String(now));
        self.fields.insert("createdBy".to_string(), Value::String(created_by.to_string()));
        self
    }

    pub fn touch_updated_at(&mut self) -> &mut Self {
        self.fields.insert("updatedAt".to_string(), Value::String(now_timestamp()));
        self
    }

    pub fn into_document(self) -> Document {
        self.fields
    }
}

impl From<Document> for Record {
    fn from(fields: Document) -> Self {
        Self { fields }
    }
}

/// Read an integer-coded enum field from any document
pub fn read_code<T>(doc: &Document, field: &str) -> Result<Option<T>, RecordError>
where
    T: TryFrom<i64, Error = UnknownCode>,
{
    match doc.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => {
            let code = value
                .as_i64()
                .ok_or_else(|| RecordError::InvalidType { field: field.to_string(), expected: "an integer" })?;
            T::try_from(code)
                .map(Some)
                .map_err(|e| RecordError::InvalidCode { field: field.to_string(), value: e.code })
        }
    }
}

pub fn doc_str<'a>(doc: &'a Document, field: &str) -> Option<&'a str> {
    doc.get(field).and_then(Value::as_str)
}

/// Changes that soft-delete a document
pub fn deleted_changes() -> Document {
    let now = now_timestamp();
    let mut changes = Document::new();
    changes.insert(RecordStatus::FIELD.to_string(), RecordStatus::Deleted.code().into());
    changes.insert("deletedAt".to_string(), Value::String(now.clone()));
    changes.insert("updatedAt".to_string(), Value::String(now));
    changes
}

/// Changes that undo a soft delete
pub fn restored_changes() -> Document {
    let mut changes = Document::new();
    changes.insert(RecordStatus::FIELD.to_string(), RecordStatus::Active.code().into());
    changes.insert("deletedAt".to_string(), Value::Null);
    changes.insert("updatedAt".to_string(), Value::String(now_timestamp()));
    changes
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Opaque public identifier: access tokens and unique ids
pub fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TicketStatus;
    use serde_json::json;

    #[test]
    fn rejects_system_fields() {
        let err = Record::from_api_input(json!({ "name": "Acme", "accessToken": "x" }));
        assert!(matches!(err, Err(RecordError::SystemFieldNotAllowed("accessToken"))));
        assert!(Record::from_api_input(json!({ "id": "1" })).is_err());
        assert!(Record::from_api_input(json!("text")).is_err());
    }

    #[test]
    fn update_input_cannot_move_tenant() {
        assert!(Record::from_api_input(json!({ "clientId": "C1" })).is_ok());
        let err = Record::from_update_input(json!({ "clientId": "C2" }));
        assert!(matches!(err, Err(RecordError::SystemFieldNotAllowed("clientId"))));
    }

    #[test]
    fn status_is_validated() {
        assert!(Record::from_api_input(json!({ "status": 0 })).is_ok());
        assert!(matches!(
            Record::from_api_input(json!({ "status": 2 })),
            Err(RecordError::InvalidCode { value: 2, .. })
        ));
        assert!(matches!(
            Record::from_api_input(json!({ "status": "active" })),
            Err(RecordError::InvalidType { .. })
        ));
    }

    #[test]
    fn stamping_new_documents() {
        let mut record = Record::from_api_input(json!({ "name": "Acme" })).unwrap();
        record.stamp_new("user-1");
        let doc = record.into_document();
        assert_eq!(doc["status"], json!(1));
        assert_eq!(doc["createdBy"], json!("user-1"));
        assert!(doc["id"].as_str().is_some_and(|id| Uuid::parse_str(id).is_ok()));

        let mut inactive = Record::from_api_input(json!({ "status": 0 })).unwrap();
        inactive.stamp_new("user-1");
        assert_eq!(inactive.get("status"), Some(&json!(0)));
    }

    #[test]
    fn reads_codes_and_required_strings() {
        let doc = Record::from(json!({ "ticketStatus": 6, "name": "  " }).as_object().unwrap().clone());
        assert_eq!(doc.read_code::<TicketStatus>("ticketStatus").unwrap(), Some(TicketStatus::ToInvoice));
        assert!(matches!(doc.require_str("name"), Err(RecordError::MissingRequiredField(_))));
        assert!(matches!(doc.require_str("email"), Err(RecordError::MissingRequiredField(_))));
    }

    #[test]
    fn soft_delete_changes() {
        let changes = deleted_changes();
        assert_eq!(changes["status"], json!(2));
        assert!(changes.contains_key("deletedAt"));
        assert_eq!(restored_changes()["status"], json!(1));
    }
}
