use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::admission::AdmissionResult;
use crate::handlers::ApiError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

// Quota info attached to admitted requests for handlers that echo it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaContext {
    pub limit: u32,
    pub remaining: u32,
    pub client_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitedBody {
    pub error: String,
    pub message: String,
    pub rate_limit: u32,
    pub remaining_requests: u32,
    pub reset_in: String,
    pub reset_at: String,
}

// ISO-8601 with millisecond precision and a trailing Z
pub fn format_reset(reset_at: DateTime<Utc>) -> String {
    reset_at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// Admission gate in front of metered routes
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let api_key = request
        .headers()
        .get(API_KEY_HEADER)
        // a present but undecodable key is still a key; it just won't match
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());
    let now = state.clock.now();

    match state.admission.admit(api_key.as_deref(), now).await {
        AdmissionResult::Admitted {
            limit,
            remaining,
            reset_at,
            client_name,
        } => {
            request.extensions_mut().insert(QuotaContext {
                limit,
                remaining,
                client_name,
            });
            let mut response = next.run(request).await;
            set_quota_headers(response.headers_mut(), limit, remaining, reset_at);
            response
        }
        AdmissionResult::RateLimited {
            limit,
            reset_at,
            minutes_until_reset,
        } => rate_limited(&state, limit, reset_at, minutes_until_reset, now),
        AdmissionResult::Unauthenticated => ApiError::MissingApiKey.into_response(),
        AdmissionResult::Forbidden => ApiError::InvalidApiKey.into_response(),
        AdmissionResult::Internal => ApiError::Internal.into_response(),
    }
}

fn set_quota_headers(
    headers: &mut HeaderMap,
    limit: u32,
    remaining: u32,
    reset_at: DateTime<Utc>,
) {
    headers.insert(LIMIT_HEADER, HeaderValue::from(limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));
    if let Ok(value) = HeaderValue::from_str(&format_reset(reset_at)) {
        headers.insert(RESET_HEADER, value);
    }
}

fn rate_limited(
    state: &AppState,
    limit: u32,
    reset_at: DateTime<Utc>,
    minutes_until_reset: u64,
    now: DateTime<Utc>,
) -> Response {
    let body = RateLimitedBody {
        error: "Rate limit exceeded".to_string(),
        message: format!(
            "You have exceeded your rate limit of {} requests per {}",
            limit,
            state.window.describe()
        ),
        rate_limit: limit,
        remaining_requests: 0,
        reset_in: format!("{} minutes", minutes_until_reset),
        reset_at: format_reset(reset_at),
    };

    let retry_after = ((reset_at - now).num_milliseconds().max(0) as u64).div_ceil(1_000);
    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}
