use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use crate::app::AppState;
use crate::auth::Credentials;
use crate::authorization::AuthorizationContext;
use crate::database::models::User;
use crate::error::ApiError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Any authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// An authenticated user with the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl CurrentUser {
    pub fn context(&self) -> AuthorizationContext {
        AuthorizationContext::from(&self.0)
    }
}

impl AdminUser {
    pub fn context(&self) -> AuthorizationContext {
        AuthorizationContext::from(&self.0)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let credentials = extract_credentials(&parts.headers);
        let user = state.authenticator.authenticate(&credentials, &[]).await?;
        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let credentials = extract_credentials(&parts.headers);
        let user = state.authenticator.authenticate_admin(&credentials, &[]).await?;
        Ok(AdminUser(user))
    }
}

/// Reads `X-API-Key` and `Authorization: Bearer <token>`. Malformed headers count as absent.
pub fn extract_credentials(headers: &HeaderMap) -> Credentials {
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    Credentials { api_key, bearer }
}
