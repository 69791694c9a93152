use axum::Json;
use serde_json::{Value, json};

// Liveness probe; does not touch the stores
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "keymeter",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
