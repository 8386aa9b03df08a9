//! Centralized authorization policy.
//!
//! Every protected handler resolves a [`Session`] and then asks this module
//! whether the session may touch a tenant's data. Client portal sessions
//! (roles 4 and 6) are pinned to their own tenant; staff (roles 1-3) are not.

pub mod public;

use axum::http::{header, HeaderMap};
use serde::Serialize;

use crate::auth::{self, Claims};
use crate::config;
use crate::database::Collection;
use crate::error::ApiError;
use crate::filter::Filter;
use crate::types::{Operation, Role};

pub type PolicyResult<T> = Result<T, ApiError>;

/// Tenant field on most collections; clients use `id` instead
pub const CLIENT_ID_FIELD: &str = "clientId";

const DENIED_MESSAGE: &str = "Access denied";
const STAFF_REQUIRED_MESSAGE: &str = "Staff access required";

/// The authenticated caller, decoded from a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
            client_id: claims.client_id,
        }
    }
}

/// Resolve the session from `Authorization: Bearer <jwt>`
pub fn require_session(headers: &HeaderMap) -> PolicyResult<Session> {
    let token = extract_bearer_token(headers).map_err(ApiError::unauthenticated)?;

    let claims = auth::decode_jwt(token).map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        ApiError::unauthenticated("Invalid or expired token")
    })?;

    Ok(Session::from(claims))
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or("Missing Authorization header")?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or("Authorization header must use Bearer token format")?
        .trim();

    if token.is_empty() {
        return Err("Empty bearer token");
    }
    Ok(token)
}

pub fn require_staff(session: &Session) -> PolicyResult<&Session> {
    if session.role.is_staff() {
        return Ok(session);
    }
    Err(deny(session, STAFF_REQUIRED_MESSAGE, "staff role required"))
}

/// Portal sessions may only reach their own tenant. Staff and technician
/// sessions pass unchanged.
pub fn assert_tenant_access(session: &Session, target_client_id: &str) -> PolicyResult<()> {
    if !session.role.is_client_portal() {
        return Ok(());
    }
    match session.client_id.as_deref() {
        Some(own) if own == target_client_id => Ok(()),
        Some(_) => Err(deny(session, DENIED_MESSAGE, "cross-tenant access")),
        None => Err(deny(session, DENIED_MESSAGE, "portal session without tenant")),
    }
}

/// Restrict a list query to the session's tenant via `clientId`
pub fn scope_list_query(session: &Session, filter: Filter) -> PolicyResult<Filter> {
    scope_list_query_on(session, filter, CLIENT_ID_FIELD)
}

/// Restrict a list query to the session's tenant via `tenant_field`.
/// The condition replaces any caller-supplied condition on that field, so
/// applying it twice gives the same query as applying it once.
pub fn scope_list_query_on(session: &Session, mut filter: Filter, tenant_field: &str) -> PolicyResult<Filter> {
    if !session.role.is_client_portal() {
        return Ok(filter);
    }
    let client_id = session
        .client_id
        .as_deref()
        .ok_or_else(|| deny(session, DENIED_MESSAGE, "portal session without tenant"))?;

    filter.where_eq(tenant_field, client_id);
    Ok(filter)
}

/// Per-collection decision combining the checks above. `tenant_id` is the
/// owning tenant of the record (or of the path, for nested routes); `None`
/// on a tenant-scoped collection means a list that the caller scopes with
/// [`scope_list_query_on`].
pub fn authorize(
    session: &Session,
    collection: Collection,
    tenant_id: Option<&str>,
    operation: Operation,
) -> PolicyResult<()> {
    if operation.is_write() && !(operation == Operation::Create && collection.portal_creatable()) {
        require_staff(session)?;
    }

    match (collection.is_tenant_scoped(), operation) {
        (true, _) => match tenant_id {
            Some(tenant_id) => assert_tenant_access(session, tenant_id),
            None if session.role.is_client_portal() && session.client_id.is_none() => {
                Err(deny(session, DENIED_MESSAGE, "portal session without tenant"))
            }
            None if session.role.is_client_portal() && operation.is_write() => {
                Err(deny(session, DENIED_MESSAGE, "portal write without tenant"))
            }
            None => Ok(()),
        },
        (false, Operation::Select) if collection.staff_only_read() => require_staff(session).map(|_| ()),
        (false, _) => Ok(()),
    }
}

/// Log a denial and build the error returned to the caller
fn deny(session: &Session, message: &str, reason: &str) -> ApiError {
    if config::config().security.enable_audit_logging {
        tracing::warn!(
            user_id = %session.user_id,
            role = %session.role,
            client_id = ?session.client_id,
            "Access denied: {}", reason
        );
    } else {
        tracing::debug!(user_id = %session.user_id, role = %session.role, "Access denied: {}", reason);
    }
    ApiError::forbidden(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};
    use serde_json::json;

    const STAFF: [Role; 3] = [Role::SuperAdmin, Role::SubAdmin, Role::Admin];
    const PORTAL: [Role; 2] = [Role::ClientAdmin, Role::ClientUser];

    fn session(role: Role, client_id: Option<&str>) -> Session {
        Session {
            user_id: "user-1".to_string(),
            role,
            client_id: client_id.map(str::to_string),
        }
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token)).unwrap());
        headers
    }

    #[test]
    fn session_requires_a_valid_bearer_token() {
        let err = require_session(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = require_session(&bearer("not-a-jwt")).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let token = auth::generate_jwt(&Claims::new("u1", Role::ClientUser, Some("C1".into()))).unwrap();
        let resolved = require_session(&bearer(&token)).unwrap();
        assert_eq!(resolved.user_id, "u1");
        assert_eq!(resolved.role, Role::ClientUser);
        assert_eq!(resolved.client_id.as_deref(), Some("C1"));
    }

    #[test]
    fn portal_sessions_are_isolated_to_their_tenant() {
        for role in PORTAL {
            let s = session(role, Some("C1"));
            assert!(assert_tenant_access(&s, "C1").is_ok());
            let err = assert_tenant_access(&s, "C2").unwrap_err();
            assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

            for op in [Operation::Select, Operation::Create, Operation::Update, Operation::Delete] {
                assert!(authorize(&s, Collection::Sites, Some("C2"), op).is_err());
            }
        }
    }

    #[test]
    fn portal_session_without_tenant_is_denied() {
        let s = session(Role::ClientAdmin, None);
        assert!(assert_tenant_access(&s, "C1").is_err());
        assert!(scope_list_query(&s, Filter::new()).is_err());
        assert!(authorize(&s, Collection::JobCards, None, Operation::Select).is_err());
    }

    #[test]
    fn staff_bypass_tenant_checks() {
        for role in STAFF {
            let s = session(role, None);
            for tenant in ["C1", "C2", "", "anything"] {
                assert!(assert_tenant_access(&s, tenant).is_ok());
            }
            assert_eq!(scope_list_query(&s, Filter::new()).unwrap(), Filter::new());
            assert!(require_staff(&s).is_ok());
            assert!(authorize(&s, Collection::Technicians, None, Operation::Delete).is_ok());
        }
    }

    #[test]
    fn list_scoping_is_idempotent_and_overrides_caller_filter() {
        let s = session(Role::ClientUser, Some("C1"));
        let mut base = Filter::new();
        base.where_clause(json!({ "clientId": "C2", "name": { "$like": "A%" } })).unwrap();

        let once = scope_list_query(&s, base.clone()).unwrap();
        let twice = scope_list_query(&s, once.clone()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.where_value("clientId"), Some(&json!("C1")));

        let clients = scope_list_query_on(&s, Filter::new(), "id").unwrap();
        assert_eq!(clients.where_value("id"), Some(&json!("C1")));
    }

    #[test]
    fn staff_gates() {
        let portal = session(Role::ClientAdmin, Some("C1"));
        let tech = session(Role::TechnicianUser, None);
        assert!(require_staff(&portal).is_err());
        assert!(require_staff(&tech).is_err());

        // Portal users may raise tickets and comment for their own tenant only
        assert!(authorize(&portal, Collection::SupportTickets, Some("C1"), Operation::Create).is_ok());
        assert!(authorize(&portal, Collection::JobCardComments, Some("C1"), Operation::Create).is_ok());
        assert!(authorize(&portal, Collection::SupportTickets, Some("C2"), Operation::Create).is_err());
        assert!(authorize(&portal, Collection::Sites, Some("C1"), Operation::Create).is_err());
        assert!(authorize(&portal, Collection::SupportTickets, Some("C1"), Operation::Update).is_err());

        // Non-tenant collections
        assert!(authorize(&portal, Collection::Users, None, Operation::Select).is_err());
        assert!(authorize(&tech, Collection::Technicians, None, Operation::Select).is_err());
        assert!(authorize(&portal, Collection::Resources, None, Operation::Select).is_ok());
        assert!(authorize(&portal, Collection::Resources, None, Operation::Create).is_err());
        assert!(authorize(&portal, Collection::Settings, None, Operation::Select).is_ok());
    }
}
