use axum::{Extension, Json};

use crate::middleware::QuotaContext;
use crate::models::StatusResponse;

// Echoes the quota the rate limiter attached to this request
pub async fn status_handler(Extension(quota): Extension<QuotaContext>) -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "API key is valid and working!".to_string(),
        remaining_requests: quota.remaining,
        rate_limit: quota.limit,
        client: quota.client_name,
    })
}
