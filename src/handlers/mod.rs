mod clients;
mod error;
mod health;
mod metrics;
mod status;
mod usage;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use std::sync::Arc;

use crate::middleware::rate_limit;
use crate::state::AppState;

pub use clients::{
    OwnerId, USER_ID_HEADER, client_usage, create_client, delete_client, list_clients,
    rotate_client_key,
};
pub use error::{ApiError, ErrorBody};
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use status::status_handler;
pub use usage::usage_handler;

// Full route table. Only /api/test/* is metered.
pub fn router(state: Arc<AppState>) -> Router {
    let metered = Router::new()
        .route("/status", get(status_handler))
        .route_layer(from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/api/test", metered)
        .route("/api/usage/{api_key}", get(usage_handler))
        .route("/api/clients", post(create_client).get(list_clients))
        .route("/api/clients/{id}", delete(delete_client))
        .route("/api/clients/{id}/usage", get(client_usage))
        .route("/api/clients/{id}/regenerate", post(rotate_client_key))
        .with_state(state)
}
