use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::config::PublicConfig;
use crate::models::now_timestamp;
use crate::state::AppState;

/// GET /health
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": now_timestamp(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /config
/// Everything except credentials.
pub async fn config_handler(State(state): State<AppState>) -> Json<PublicConfig> {
    Json(state.config.public_view(state.llm.model_name()))
}
