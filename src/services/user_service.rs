use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::base::{
    Action, BaseService, BulkCreateService, BulkDeleteService, BulkUpdateService, CreateService,
    DeleteService, ListService, ReadService, UpdateService,
};
use super::error::ServiceError;
use crate::authorization::{AuthorizationContext, Unscoped};
use crate::database::models::{ClerkUserUpdate, User, UserCreate, UserPatch};
use crate::database::{Changeset, FieldValue, Repository, Session};
use crate::filter::FilterParams;

/// Columns a user listing may be ordered by.
pub const ORDER_FIELDS: &[&str] = &["email", "role", "created_at", "updated_at"];

pub struct UserService {
    repository: Repository<User>,
}

impl UserService {
    pub fn for_user(session: &Session, context: AuthorizationContext) -> Self {
        Self { repository: Repository::from_session(session, Arc::new(Unscoped), Some(context)) }
    }

    pub fn for_system(session: &Session) -> Self {
        Self { repository: Repository::from_session(session, Arc::new(Unscoped), None) }
    }

    pub async fn get_by_email(&self, email: &str) -> Result<User, ServiceError> {
        self.get_by_column("email", email, "email").await
    }

    pub async fn get_by_clerk_id(&self, clerk_id: &str) -> Result<User, ServiceError> {
        self.get_by_column("clerk_id", clerk_id, "clerk id").await
    }

    async fn get_by_column(&self, column: &'static str, value: &str, label: &str) -> Result<User, ServiceError> {
        self.authorize(Action::Read)?;
        let user = self
            .repository
            .get_by(column, FieldValue::Text(value.to_string()))
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("User with {} {} not found", label, value)))?;
        self.authorize_instance(Action::Read, &user)?;
        Ok(user)
    }

    /// Applies an identity-provider email change to an already fetched user.
    pub async fn sync_email(&self, user: &User, update: &ClerkUserUpdate) -> Result<User, ServiceError> {
        self.authorize(Action::Update)?;
        self.authorize_instance(Action::Update, user)?;
        validate_email(&update.email)?;
        let mut changes = update.changes();
        changes.set("updated_by", self.actor());
        let updated = self.repository.update(user, &changes).await?;
        info!("Synced email for user {}", updated.id);
        Ok(updated)
    }
}

fn validate_email(email: &str) -> Result<(), ServiceError> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    };
    if valid && !email.contains(char::is_whitespace) {
        Ok(())
    } else {
        Err(ServiceError::validation(format!("Invalid email address: {}", email)))
    }
}

impl BaseService for UserService {
    type Entity = User;

    const ENTITY_NAME: &'static str = "User";

    fn repository(&self) -> &Repository<User> {
        &self.repository
    }

    /// Admins may do anything; other users may only read and update.
    fn check_general_permissions(&self, action: Action, context: &AuthorizationContext) -> Result<(), ServiceError> {
        if context.is_admin() || matches!(action, Action::Read | Action::Update) {
            Ok(())
        } else {
            Err(ServiceError::permission_denied("Action not allowed"))
        }
    }

    /// Nobody deletes themselves; admins may touch anyone; other users only their own record.
    fn check_instance_permissions(
        &self,
        action: Action,
        instance: &User,
        context: &AuthorizationContext,
    ) -> Result<(), ServiceError> {
        let is_self = instance.id == context.user_id;
        if matches!(action, Action::Delete | Action::BulkDelete) && is_self {
            return Err(ServiceError::permission_denied("You are not allowed to delete yourself"));
        }
        if context.is_admin() || (is_self && matches!(action, Action::Read | Action::Update)) {
            return Ok(());
        }
        Err(ServiceError::permission_denied("Access denied"))
    }
}

impl ReadService for UserService {}

impl ListService for UserService {
    fn validate_filters(&self, filters: &FilterParams) -> Result<(), ServiceError> {
        filters.validate()?;
        filters.validate_order_by(ORDER_FIELDS)?;
        Ok(())
    }
}

#[async_trait]
impl CreateService for UserService {
    type Create = UserCreate;

    async fn validate_create(&self, data: &UserCreate) -> Result<(), ServiceError> {
        validate_email(&data.email)
    }
}

impl UpdateService for UserService {
    type Patch = UserPatch;
}

impl DeleteService for UserService {}

impl BulkCreateService for UserService {}

impl BulkUpdateService for UserService {}

#[async_trait]
impl BulkDeleteService for UserService {
    async fn validate_bulk_delete(&self, ids: &[Uuid]) -> Result<(), ServiceError> {
        match self.context() {
            Some(context) if ids.contains(&context.user_id) => {
                Err(ServiceError::permission_denied("You are not allowed to delete yourself"))
            }
            _ => Ok(()),
        }
    }
}
