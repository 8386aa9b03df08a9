use serde_json::Value;

use crate::database::Document;
use crate::policy::Session;

/// Never serialized to any caller
const SECRET_FIELDS: &[&str] = &["passwordHash"];

/// Only staff may see these
const STAFF_ONLY_FIELDS: &[&str] = &["accessToken"];

/// Fields shown on public (unauthenticated) pages
const PUBLIC_HIDDEN_FIELDS: &[&str] = &["accessToken", "createdBy", "deletedAt", "passwordHash"];

/// Convert a stored document into the wire format for `session`
pub fn present(mut doc: Document, session: &Session) -> Value {
    for field in SECRET_FIELDS {
        doc.remove(*field);
    }
    if !session.role.is_staff() {
        for field in STAFF_ONLY_FIELDS {
            doc.remove(*field);
        }
    }
    Value::Object(doc)
}

pub fn present_all(docs: Vec<Document>, session: &Session) -> Vec<Value> {
    docs.into_iter().map(|doc| present(doc, session)).collect()
}

/// Wire format for the public portal
pub fn present_public(mut doc: Document) -> Value {
    for field in PUBLIC_HIDDEN_FIELDS {
        doc.remove(*field);
    }
    Value::Object(doc)
}

/// Keep only `fields` from a document, for public summaries
pub fn pick(doc: &Document, fields: &[&str]) -> Value {
    let picked: Document = fields
        .iter()
        .filter_map(|f| doc.get(*f).map(|v| (f.to_string(), v.clone())))
        .collect();
    Value::Object(picked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use serde_json::json;

    fn session(role: Role) -> Session {
        Session { user_id: "u".into(), role, client_id: Some("C1".into()) }
    }

    #[test]
    fn secrets_are_stripped_per_role() {
        let doc = json!({ "id": "C1", "accessToken": "t", "passwordHash": "h" }).as_object().unwrap().clone();

        let staff = present(doc.clone(), &session(Role::Admin));
        assert_eq!(staff, json!({ "id": "C1", "accessToken": "t" }));

        let portal = present(doc.clone(), &session(Role::ClientAdmin));
        assert_eq!(portal, json!({ "id": "C1" }));

        assert_eq!(present_public(doc.clone()), json!({ "id": "C1" }));
        assert_eq!(pick(&doc, &["id", "missing"]), json!({ "id": "C1" }));
    }
}
