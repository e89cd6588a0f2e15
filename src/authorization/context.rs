use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{Role, User};

/// The acting identity for one request. Built from the authenticated user, never persisted.
///
/// Code paths without a context run as trusted system operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationContext {
    pub user_id: Uuid,
    pub user_email: String,
    pub user_role: Role,
    pub organization_id: Option<Uuid>,
}

impl AuthorizationContext {
    pub fn new(user_id: Uuid, user_email: impl Into<String>, user_role: Role) -> Self {
        Self {
            user_id,
            user_email: user_email.into(),
            user_role,
            organization_id: None,
        }
    }

    pub fn with_organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    pub fn is_admin(&self) -> bool {
        self.user_role == Role::Admin
    }
}

impl From<&User> for AuthorizationContext {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.email.clone(), user.role)
    }
}
