use axum::Json;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use std::sync::Arc;
use uuid::Uuid;

use super::error::ApiError;
use crate::models::{
    ClientUsage, CreateClientRequest, CreateClientResponse, DeleteClientResponse,
    RotateKeyResponse, UsageResponse,
};
use crate::state::AppState;

// Set by the upstream auth layer once the user is logged in
pub const USER_ID_HEADER: &str = "x-user-id";

// Identity of the user that owns the clients being managed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerId(pub String);

impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| OwnerId(value.to_string()))
            .ok_or(ApiError::MissingUser)
    }
}

pub async fn create_client(
    State(state): State<Arc<AppState>>,
    OwnerId(user_id): OwnerId,
    Json(body): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<CreateClientResponse>), ApiError> {
    let client = state
        .clients
        .register(&user_id, &body.name, body.rate_limit, state.clock.now())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateClientResponse {
            id: client.id,
            name: client.name,
            api_key: client.api_key,
            rate_limit: client.rate_limit,
        }),
    ))
}

pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    OwnerId(user_id): OwnerId,
) -> Result<Json<Vec<ClientUsage>>, ApiError> {
    let listing = state
        .clients
        .list_with_usage(&user_id, state.clock.now())
        .await?;
    Ok(Json(listing))
}

pub async fn client_usage(
    State(state): State<Arc<AppState>>,
    OwnerId(user_id): OwnerId,
    Path(id): Path<Uuid>,
) -> Result<Json<UsageResponse>, ApiError> {
    let snapshot = state.clients.usage(&user_id, id, state.clock.now()).await?;
    Ok(Json(UsageResponse::counts_only(&snapshot)))
}

pub async fn rotate_client_key(
    State(state): State<Arc<AppState>>,
    OwnerId(user_id): OwnerId,
    Path(id): Path<Uuid>,
) -> Result<Json<RotateKeyResponse>, ApiError> {
    let (old_api_key, new_api_key) = state
        .clients
        .rotate_key(&user_id, id, state.clock.now())
        .await?;
    Ok(Json(RotateKeyResponse {
        old_api_key,
        new_api_key,
    }))
}

pub async fn delete_client(
    State(state): State<Arc<AppState>>,
    OwnerId(user_id): OwnerId,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteClientResponse>, ApiError> {
    state.clients.delete(&user_id, id).await?;
    Ok(Json(DeleteClientResponse {
        message: "Client deleted successfully".to_string(),
        client_id: id,
    }))
}
