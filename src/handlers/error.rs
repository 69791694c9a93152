use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::clients::ClientError;
use crate::reporter::ReportError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

// Every non-quota failure the HTTP layer can return
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("API key is required")]
    MissingApiKey,
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("User identity is required")]
    MissingUser,
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("Client not found")]
    NotFound,
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingApiKey | ApiError::MissingUser => StatusCode::UNAUTHORIZED,
            ApiError::InvalidApiKey => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> &'static str {
        match self {
            ApiError::MissingApiKey => "Please provide your API key in the X-API-Key header",
            ApiError::InvalidApiKey => "The provided API key is not valid",
            ApiError::MissingUser => "Please provide the owning user id in the X-User-Id header",
            ApiError::BadRequest(message) => *message,
            ApiError::NotFound => "No client matches this request",
            ApiError::Internal => "An error occurred while processing your request",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
            message: self.detail().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Invalid(message) => ApiError::BadRequest(message),
            ClientError::NotFound => ApiError::NotFound,
            ClientError::Store(err) => {
                error!(error = %err, "client store failure");
                ApiError::Internal
            }
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::NotFound => ApiError::NotFound,
            ReportError::Store(err) => {
                error!(error = %err, "usage report failed");
                ApiError::Internal
            }
        }
    }
}
