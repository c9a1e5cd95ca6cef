use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Service version plus the generation model currently in use, if any.
/// Never triggers discovery.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(health_body(
        state.pipeline.llm().selected_model(),
        state.config.gemini_api_key.is_some(),
    ))
}

fn health_body(model: Option<String>, generation_configured: bool) -> Value {
    let generation = if generation_configured {
        "configured"
    } else {
        "fallback_only"
    };
    json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "mentor-api",
        "generation": generation,
        "model": model,
    })
}
