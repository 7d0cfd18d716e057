use axum::Json;
use serde_json::{json, Value};

/// GET /health
/// Liveness only; touches neither the store nor the model provider.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "jobcus-api"
    }))
}
