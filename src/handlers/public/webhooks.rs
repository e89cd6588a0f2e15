use axum::{body::Bytes, extract::State, response::Json};
use serde_json::{json, Value};
use tracing::error;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::{ClerkEvent, ClerkUserService, ServiceError, WebhookOutcome};

/// POST /webhooks/clerk - Mirror identity-provider user events into the local store
///
/// Payload problems answer 400 with the reason. Anything else answers a generic 500.
pub async fn clerk_post(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let event: ClerkEvent = serde_json::from_slice(&body).map_err(|e| {
        error!("Invalid Clerk webhook payload: {}", e);
        ApiError::invalid_json(e.to_string())
    })?;

    let service = ClerkUserService::for_system(&state.session);
    match service.handle_event(&event).await {
        Ok(outcome) => {
            if let WebhookOutcome::Created(user) | WebhookOutcome::Updated(user) = &outcome {
                tracing::debug!("Clerk event {} applied to user {}", event.event_type, user.id);
            }
            Ok(Json(json!({ "status": "ok" })))
        }
        Err(ServiceError::Validation(msg)) => {
            error!("Invalid Clerk webhook payload: {}", msg);
            Err(ApiError::bad_request(msg))
        }
        Err(e) => {
            error!("Error processing Clerk webhook: {}", e);
            Err(ApiError::internal_server_error("Internal server error"))
        }
    }
}
