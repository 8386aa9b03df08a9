//! Staff-managed user accounts, login and the admin bootstrap.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use super::resource_service::{ResourceService, Scope};
use crate::api::format;
use crate::auth::{self, Claims};
use crate::database::record::doc_str;
use crate::database::{Collection, Document, DocumentStore, Record};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::policy::{self, Session};
use crate::types::{RecordStatus, Role};

const BAD_CREDENTIALS_MESSAGE: &str = "Invalid email or password";

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: Value,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    pub role: Role,
    pub client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(email(message = "Must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub role: Option<Role>,
    pub client_id: Option<String>,
    pub status: Option<RecordStatus>,
}

pub struct UserService<'a> {
    store: &'a dyn DocumentStore,
    users: ResourceService<'a>,
}

impl<'a> UserService<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            users: ResourceService::new(store, Collection::Users),
        }
    }

    pub fn resources(&self) -> &ResourceService<'a> {
        &self.users
    }

    /// Unknown email, inactive account and wrong password all fail the same way
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ApiError> {
        request.validate()?;
        let email = normalize_email(&request.email);

        let mut filter = Filter::new();
        filter
            .where_eq("email", email.as_str())
            .where_eq(RecordStatus::FIELD, RecordStatus::Active.code());
        let user = self.store.find_one(Collection::Users, &filter).await?;

        let Some(user) = user else {
            tracing::info!("Login failed for unknown or inactive account");
            return Err(ApiError::unauthenticated(BAD_CREDENTIALS_MESSAGE));
        };
        let stored_hash = doc_str(&user, "passwordHash").unwrap_or_default();
        if !auth::verify_password(&request.password, stored_hash) {
            tracing::info!(user_id = ?user.get("id"), "Login failed: wrong password");
            return Err(ApiError::unauthenticated(BAD_CREDENTIALS_MESSAGE));
        }

        let session = session_for(&user)?;
        let claims = Claims::new(session.user_id.clone(), session.role, session.client_id.clone());
        let token = auth::generate_jwt(&claims).map_err(|e| {
            tracing::error!("Failed to sign session token: {}", e);
            ApiError::internal("Unable to create session")
        })?;

        tracing::info!(user_id = %session.user_id, role = %session.role, "User logged in");
        Ok(LoginResponse {
            token,
            expires_in: claims.expires_in(),
            user: format::present(user, &session),
        })
    }

    /// The session plus the user document behind it
    pub async fn whoami(&self, session: &Session) -> Result<Value, ApiError> {
        let user = self
            .users
            .fetch(&session.user_id)
            .await
            .map_err(|_| ApiError::unauthenticated("Session user no longer exists"))?;
        Ok(json!({ "session": session, "user": format::present(user, session) }))
    }

    pub async fn create(&self, session: &Session, request: CreateUserRequest) -> Result<Document, ApiError> {
        policy::require_staff(session)?;
        request.validate()?;

        let email = normalize_email(&request.email);
        self.ensure_email_free(&email, None).await?;
        let client_id = self.client_for_role(request.role, request.client_id).await?;

        let mut record = Record::new();
        record
            .set("email", email.as_str())
            .set("name", request.name.trim())
            .set("role", request.role.code())
            .set("passwordHash", hash(&request.password)?);
        if let Some(client_id) = client_id {
            record.set("clientId", client_id);
        }

        let record = self.users.prepare_create(session, record, &Scope::root())?;
        let user = self.store.insert(Collection::Users, record.into_document()).await?;
        tracing::info!(user_id = %session.user_id, "Created user {} with role {}", email, request.role);
        Ok(user)
    }

    pub async fn update(&self, session: &Session, id: &str, request: UpdateUserRequest) -> Result<Document, ApiError> {
        policy::require_staff(session)?;
        request.validate()?;
        let current = self.users.prepare_update(session, id, &Scope::root()).await?;

        let mut changes = Record::new();
        if let Some(email) = &request.email {
            let email = normalize_email(email);
            self.ensure_email_free(&email, Some(id)).await?;
            changes.set("email", email);
        }
        if let Some(password) = &request.password {
            changes.set("passwordHash", hash(password)?);
        }
        if let Some(name) = &request.name {
            changes.set("name", name.trim());
        }
        if let Some(status) = request.status {
            if status == RecordStatus::Deleted {
                return Err(ApiError::invalid_field("status", "Use DELETE to remove a user"));
            }
            changes.set(RecordStatus::FIELD, status.code());
        }

        if request.role.is_some() || request.client_id.is_some() {
            let role = match request.role {
                Some(role) => role,
                None => stored_role(&current)?,
            };
            let client_id = request
                .client_id
                .or_else(|| doc_str(&current, "clientId").map(str::to_string));
            let client_id = self.client_for_role(role, client_id).await?;
            changes
                .set("role", role.code())
                .set("clientId", client_id.map_or(Value::Null, Value::String));
        }

        if changes.is_empty() {
            return Err(ApiError::validation("No fields to update"));
        }
        changes.touch_updated_at();
        Ok(self.store.update(Collection::Users, id, changes.into_document()).await?)
    }

    /// Create the first super admin unless a user with `email` exists.
    /// Returns the new user, or `None` when nothing was created.
    pub async fn bootstrap_admin(&self, email: &str, password: &str, name: &str) -> Result<Option<Document>, ApiError> {
        let email = normalize_email(email);
        let mut existing = Filter::new();
        existing.where_eq("email", email.as_str()).include_deleted(true);
        if self.store.count(Collection::Users, &existing).await? > 0 {
            tracing::debug!("Admin {} already exists", email);
            return Ok(None);
        }
        if password.len() < 8 {
            return Err(ApiError::invalid_field("password", "Password must be at least 8 characters"));
        }

        let mut record = Record::new();
        record
            .set("email", email.as_str())
            .set("name", name)
            .set("role", Role::SuperAdmin.code())
            .set("passwordHash", hash(password)?)
            .stamp_new("system");
        let user = self.store.insert(Collection::Users, record.into_document()).await?;
        tracing::info!("Bootstrapped super admin {}", email);
        Ok(Some(user))
    }

    async fn ensure_email_free(&self, email: &str, except_id: Option<&str>) -> Result<(), ApiError> {
        let mut filter = Filter::new();
        filter.where_eq("email", email);
        if let Some(id) = except_id {
            filter.where_eq("id", json!({ "$ne": id }));
        }
        if self.store.count(Collection::Users, &filter).await? > 0 {
            return Err(ApiError::conflict("A user with this email already exists"));
        }
        Ok(())
    }

    /// Portal roles belong to an existing client; other roles carry none
    async fn client_for_role(&self, role: Role, client_id: Option<String>) -> Result<Option<String>, ApiError> {
        if !role.is_client_portal() {
            return Ok(None);
        }
        let client_id = client_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::missing_field("clientId"))?;
        ResourceService::new(self.store, Collection::Clients)
            .fetch(&client_id)
            .await
            .map_err(|_| ApiError::invalid_field("clientId", "Client not found"))?;
        Ok(Some(client_id))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash(password: &str) -> Result<String, ApiError> {
    auth::hash_password(password).map_err(|e| {
        tracing::error!("{}", e);
        ApiError::internal("Unable to store password")
    })
}

fn stored_role(user: &Document) -> Result<Role, ApiError> {
    user.get("role")
        .and_then(Value::as_i64)
        .and_then(|code| Role::try_from(code).ok())
        .ok_or_else(|| {
            tracing::error!(user_id = ?user.get("id"), "User has no valid role");
            ApiError::internal("User account is misconfigured")
        })
}

fn session_for(user: &Document) -> Result<Session, ApiError> {
    Ok(Session {
        user_id: doc_str(user, "id").unwrap_or_default().to_string(),
        role: stored_role(user)?,
        client_id: doc_str(user, "clientId").map(str::to_string),
    })
}
