use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET {prefix}/health - Liveness plus a database probe
pub async fn get(State(state): State<AppState>) -> Json<Value> {
    let database = match state.session.health_check().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            "unavailable"
        }
    };

    Json(json!({
        "health": "UP",
        "testing": state.config.testing,
        "database": database,
    }))
}
