//! Keeps local users in step with the identity provider's user events.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::base::{CreateService, DeleteService};
use super::error::ServiceError;
use super::user_service::UserService;
use crate::database::models::{ClerkUserUpdate, Role, User, UserCreate};
use crate::database::Session;

/// Webhook envelope. `data` is only interpreted for the event types handled below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClerkEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClerkEmailAddress {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClerkUserData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email_addresses: Option<Vec<ClerkEmailAddress>>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
}

impl ClerkUserData {
    pub fn from_value(value: &Value) -> Result<Self, ServiceError> {
        Self::deserialize(value).map_err(|e| ServiceError::validation(format!("Invalid Clerk payload: {}", e)))
    }

    /// The only address, or the one whose id matches `primary_email_address_id`.
    pub fn primary_email(&self) -> Result<&str, ServiceError> {
        let entries = self
            .email_addresses
            .as_deref()
            .ok_or_else(|| ServiceError::validation("email_addresses not found in the Clerk payload"))?;

        let entry = match entries {
            [only] => Some(only),
            _ => entries
                .iter()
                .find(|e| e.id.is_some() && e.id == self.primary_email_address_id),
        };

        entry
            .and_then(|e| e.email_address.as_deref())
            .ok_or_else(|| ServiceError::validation("Primary email address not found in the Clerk payload"))
    }

    pub fn clerk_id(&self) -> Result<&str, ServiceError> {
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(ServiceError::validation("Missing clerk id")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    Created(User),
    Updated(User),
    Deleted,
    Ignored(String),
}

/// System-mode user operations driven by webhook payloads.
pub struct ClerkUserService {
    users: UserService,
}

impl ClerkUserService {
    pub fn for_system(session: &Session) -> Self {
        Self { users: UserService::for_system(session) }
    }

    pub async fn handle_event(&self, event: &ClerkEvent) -> Result<WebhookOutcome, ServiceError> {
        match event.event_type.as_str() {
            "user.created" => {
                let data = ClerkUserData::from_value(&event.data)?;
                Ok(WebhookOutcome::Created(self.create_user(&data).await?))
            }
            "user.updated" => {
                let data = ClerkUserData::from_value(&event.data)?;
                Ok(WebhookOutcome::Updated(self.update_user(&data).await?))
            }
            "user.deleted" => {
                let data = ClerkUserData::from_value(&event.data)?;
                self.delete_user(&data).await?;
                Ok(WebhookOutcome::Deleted)
            }
            other => {
                info!("Unhandled Clerk event type: {}", other);
                Ok(WebhookOutcome::Ignored(other.to_string()))
            }
        }
    }

    /// Links or creates the local user. Existing links only get their email refreshed.
    pub async fn create_user(&self, data: &ClerkUserData) -> Result<User, ServiceError> {
        let clerk_id = data.clerk_id()?;
        let email = data.primary_email()?;

        match self.users.get_by_clerk_id(clerk_id).await {
            Ok(user) if user.email == email => return Ok(user),
            Ok(user) => return self.sync_email(&user, email).await,
            Err(ServiceError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        match self.users.get_by_email(email).await {
            Ok(_) => Err(ServiceError::validation(format!("User with email {} already exists", email))),
            Err(ServiceError::NotFound(_)) => {
                let create = UserCreate { email: email.to_string(), role: Role::Standard, clerk_id: Some(clerk_id.to_string()) };
                let user = self.users.create(&create).await?;
                info!("Created user {} for clerk id {}", user.id, clerk_id);
                Ok(user)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn update_user(&self, data: &ClerkUserData) -> Result<User, ServiceError> {
        let clerk_id = data.clerk_id()?;
        let user = self.users.get_by_clerk_id(clerk_id).await?;
        let email = data.primary_email()?;
        if user.email == email {
            return Ok(user);
        }
        self.sync_email(&user, email).await
    }

    pub async fn delete_user(&self, data: &ClerkUserData) -> Result<bool, ServiceError> {
        let clerk_id = data.clerk_id()?;
        let user = self.users.get_by_clerk_id(clerk_id).await?;
        let deleted = self.users.delete(user.id).await?;
        info!("Deleted user {} for clerk id {}", user.id, clerk_id);
        Ok(deleted)
    }

    async fn sync_email(&self, user: &User, email: &str) -> Result<User, ServiceError> {
        self.users.sync_email(user, &ClerkUserUpdate { email: email.to_string() }).await
    }
}
