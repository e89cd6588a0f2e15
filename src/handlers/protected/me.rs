use axum::{extract::State, response::Json};

use crate::app::AppState;
use crate::database::models::{ApiKeyGenerated, UserRead};
use crate::error::ApiError;
use crate::handlers::Status;
use crate::middleware::CurrentUser;
use crate::services::ApiKeyService;

/// GET {prefix}/me - The caller's own profile
pub async fn get(CurrentUser(user): CurrentUser) -> Json<UserRead> {
    Json(UserRead::from(user))
}

/// POST {prefix}/me/api-key - Issue a new key, replacing any existing one
pub async fn api_key_post(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiKeyGenerated>, ApiError> {
    let service = ApiKeyService::for_user(&state.session, current.context(), state.hasher.clone());
    Ok(Json(service.generate_api_key(&current.0).await?))
}

/// DELETE {prefix}/me/api-key - Revoke the caller's key
pub async fn api_key_delete(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Status>, ApiError> {
    let service = ApiKeyService::for_user(&state.session, current.context(), state.hasher.clone());
    service.revoke_api_key(&current.0).await?;
    Ok(Json(Status::new("API key revoked successfully")))
}
