use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = match &state.db {
        None => "memory",
        Some(db) => match db.ping().await {
            Ok(()) => "ok",
            Err(e) => {
                tracing::error!("Health check: database unreachable: {}", e);
                "down"
            }
        },
    };

    let status = if database == "down" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status, Json(json!({ "status": if status.is_success() { "ok" } else { "degraded" }, "database": database })))
}
