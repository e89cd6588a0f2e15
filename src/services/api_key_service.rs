use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::base::{Action, BaseService, CreateService, DeleteService, ReadService};
use super::error::ServiceError;
use crate::auth::ApiKeyHasher;
use crate::authorization::{AuthorizationContext, OwnerScope};
use crate::database::models::{ApiKey, ApiKeyCreate, ApiKeyGenerated, User};
use crate::database::{FieldValue, Repository, Session};

const NOT_FOUND: &str = "API key not found";

/// One API key per user, stored as a keyed hash and visible only to its owner.
pub struct ApiKeyService {
    repository: Repository<ApiKey>,
    hasher: ApiKeyHasher,
}

impl ApiKeyService {
    pub fn for_user(session: &Session, context: AuthorizationContext, hasher: ApiKeyHasher) -> Self {
        Self {
            repository: Repository::from_session(session, Arc::new(OwnerScope::new("user_id")), Some(context)),
            hasher,
        }
    }

    pub fn for_system(session: &Session, hasher: ApiKeyHasher) -> Self {
        Self {
            repository: Repository::from_session(session, Arc::new(OwnerScope::new("user_id")), None),
            hasher,
        }
    }

    pub fn hash_api_key(&self, api_key: &str) -> String {
        self.hasher.hash(api_key)
    }

    pub fn verify_api_key(&self, api_key: &str, key_hash: &str) -> bool {
        self.hasher.verify(api_key, key_hash)
    }

    pub async fn get_by_user_id(&self, user_id: Uuid) -> Result<ApiKey, ServiceError> {
        self.get_by_column("user_id", FieldValue::Uuid(user_id)).await
    }

    pub async fn get_by_api_key_hash(&self, key_hash: &str) -> Result<ApiKey, ServiceError> {
        self.get_by_column("key_hash", FieldValue::Text(key_hash.to_string())).await
    }

    async fn get_by_column(&self, column: &'static str, value: FieldValue) -> Result<ApiKey, ServiceError> {
        self.authorize(Action::Read)?;
        let key = self
            .repository
            .get_by(column, value)
            .await?
            .ok_or_else(|| ServiceError::not_found(NOT_FOUND))?;
        self.authorize_instance(Action::Read, &key)?;
        Ok(key)
    }

    /// Replaces the user's key with a fresh one and returns the plaintext.
    pub async fn generate_api_key(&self, user: &User) -> Result<ApiKeyGenerated, ServiceError> {
        match self.get_by_user_id(user.id).await {
            Ok(existing) => {
                self.delete(existing.id).await?;
            }
            Err(ServiceError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let api_key = self.hasher.generate();
        let key_hash = self.hash_api_key(&api_key);
        self.create(&ApiKeyCreate { key_hash, user_id: user.id }).await?;
        info!("Generated API key for user {}", user.id);

        Ok(ApiKeyGenerated { api_key })
    }

    pub async fn revoke_api_key(&self, user: &User) -> Result<bool, ServiceError> {
        let key = self.get_by_user_id(user.id).await?;
        let deleted = self.delete(key.id).await?;
        info!("Revoked API key for user {}", user.id);
        Ok(deleted)
    }
}

impl BaseService for ApiKeyService {
    type Entity = ApiKey;

    const ENTITY_NAME: &'static str = "API key";

    fn repository(&self) -> &Repository<ApiKey> {
        &self.repository
    }

    fn not_found(&self, _id: Uuid) -> ServiceError {
        ServiceError::not_found(NOT_FOUND)
    }
}

impl ReadService for ApiKeyService {}

impl CreateService for ApiKeyService {
    type Create = ApiKeyCreate;
}

impl DeleteService for ApiKeyService {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Role, UserCreate};
    use crate::services::UserService;

    fn hasher() -> ApiKeyHasher {
        ApiKeyHasher::new("test-secret")
    }

    async fn user(session: &Session, email: &str) -> User {
        UserService::for_system(session).create(&UserCreate::new(email, Role::Standard)).await.unwrap()
    }

    #[tokio::test]
    async fn generate_replaces_existing_key() {
        let session = Session::memory();
        let alice = user(&session, "alice@example.com").await;
        let service = ApiKeyService::for_user(&session, AuthorizationContext::from(&alice), hasher());

        let first = service.generate_api_key(&alice).await.unwrap();
        let second = service.generate_api_key(&alice).await.unwrap();
        assert_ne!(first.api_key, second.api_key);
        assert_eq!(first.api_key.len(), 43);

        let stored = service.get_by_user_id(alice.id).await.unwrap();
        assert_eq!(stored.key_hash, service.hash_api_key(&second.api_key));
        assert!(service.verify_api_key(&second.api_key, &stored.key_hash));

        let system = ApiKeyService::for_system(&session, hasher());
        let err = system.get_by_api_key_hash(&system.hash_api_key(&first.api_key)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(m) if m == "API key not found"));
    }

    #[tokio::test]
    async fn keys_are_visible_only_to_their_owner() {
        let session = Session::memory();
        let alice = user(&session, "alice@example.com").await;
        let bob = user(&session, "bob@example.com").await;

        ApiKeyService::for_user(&session, AuthorizationContext::from(&alice), hasher())
            .generate_api_key(&alice)
            .await
            .unwrap();

        let as_bob = ApiKeyService::for_user(&session, AuthorizationContext::from(&bob), hasher());
        assert!(matches!(as_bob.get_by_user_id(alice.id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn revoke_without_key_is_not_found() {
        let session = Session::memory();
        let alice = user(&session, "alice@example.com").await;
        let service = ApiKeyService::for_user(&session, AuthorizationContext::from(&alice), hasher());

        assert!(matches!(service.revoke_api_key(&alice).await, Err(ServiceError::NotFound(_))));
        service.generate_api_key(&alice).await.unwrap();
        assert!(service.revoke_api_key(&alice).await.unwrap());
        assert!(matches!(service.get_by_user_id(alice.id).await, Err(ServiceError::NotFound(_))));
    }
}
