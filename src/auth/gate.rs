use std::sync::Arc;
use tracing::{debug, warn};

use super::api_key::ApiKeyHasher;
use super::error::AuthError;
use super::jwt::{JwtError, JwtVerifier};
use crate::database::models::{Role, User};
use crate::database::Session;
use crate::services::{ApiKeyService, ReadService, UserService};

/// Raw credentials lifted from a request.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub bearer: Option<String>,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.bearer.is_none()
    }
}

/// Resolves credentials to a local user. An API key wins over a bearer token when both are sent.
pub struct Authenticator {
    session: Session,
    hasher: ApiKeyHasher,
    verifier: Arc<JwtVerifier>,
}

impl Authenticator {
    pub fn new(session: Session, hasher: ApiKeyHasher, verifier: Arc<JwtVerifier>) -> Self {
        Self { session, hasher, verifier }
    }

    pub async fn authenticate(&self, credentials: &Credentials, scopes: &[&str]) -> Result<User, AuthError> {
        if let Some(api_key) = &credentials.api_key {
            return self.with_api_key(api_key).await;
        }
        if let Some(token) = &credentials.bearer {
            return self.with_token(token, scopes).await;
        }
        Err(AuthError::unauthenticated("No valid authentication method provided"))
    }

    pub async fn authenticate_admin(&self, credentials: &Credentials, scopes: &[&str]) -> Result<User, AuthError> {
        let user = self.authenticate(credentials, scopes).await?;
        if user.role != Role::Admin {
            return Err(AuthError::unauthorized("User is not an admin."));
        }
        Ok(user)
    }

    async fn with_api_key(&self, api_key: &str) -> Result<User, AuthError> {
        let keys = ApiKeyService::for_system(&self.session, self.hasher.clone());
        let key = match keys.get_by_api_key_hash(&keys.hash_api_key(api_key)).await {
            Ok(key) => key,
            Err(e) => {
                debug!("API key rejected: {}", e);
                return Err(AuthError::unauthenticated("Invalid API key"));
            }
        };
        UserService::for_system(&self.session).get_by_id(key.user_id).await.map_err(|e| {
            warn!("API key {} has no usable owner: {}", key.id, e);
            AuthError::unauthenticated("Invalid API key")
        })
    }

    async fn with_token(&self, token: &str, scopes: &[&str]) -> Result<User, AuthError> {
        let claims = self.verifier.verify(token, scopes).await.map_err(|e| {
            match e {
                JwtError::MissingScopeClaim | JwtError::MissingScope(_) => {
                    debug!("Bearer token lacks required scope: {}", e)
                }
                _ => debug!("Bearer token rejected: {}", e),
            }
            AuthError::unauthenticated("Invalid token")
        })?;

        let Some(email) = claims.email.as_deref() else {
            debug!("Bearer token for {:?} carries no email claim", claims.sub);
            return Err(AuthError::unauthenticated("Invalid token"));
        };

        UserService::for_system(&self.session).get_by_email(email).await.map_err(|e| {
            debug!("No local user for token email {}: {}", email, e);
            AuthError::unauthenticated("Invalid token")
        })
    }
}
