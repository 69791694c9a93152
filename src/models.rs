use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// Registered API client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub api_key: String,
    pub rate_limit: u32, // max admitted requests per window, >= 1
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn new(user_id: &str, name: &str, rate_limit: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            api_key: generate_api_key(),
            rate_limit,
            created_at: now,
        }
    }
}

// Per-key counter for the current window.
// count and window_start always move together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub count: u32,
    pub window_start: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }
}

// Read-only view of a key's usage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub limit: u32,
    pub used: u32,
    pub remaining: u32,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub minutes_until_reset: u64,
}

// 32 random bytes, hex encoded
pub fn generate_api_key() -> String {
    let bytes: [u8; 32] = rand::random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// Short hash of a key so logs never carry the credential itself
pub fn fingerprint(api_key: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(api_key.as_bytes()));
    digest[..12].to_string()
}

// Request body for client registration
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientResponse {
    pub id: Uuid,
    pub name: String,
    pub api_key: String,
    pub rate_limit: u32,
}

// Client as shown in the owner's listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientUsage {
    pub id: Uuid,
    pub name: String,
    pub api_key: String,
    pub rate_limit: u32,
    pub created_at: DateTime<Utc>,
    pub request_count: u32,
    pub window_start: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub rate_limit: u32,
    pub used_requests: u32,
    pub remaining_requests: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_end: Option<DateTime<Utc>>,
}

impl UsageResponse {
    pub fn with_window(snapshot: &UsageSnapshot) -> Self {
        Self {
            window_start: Some(snapshot.window_start),
            window_end: Some(snapshot.window_end),
            ..Self::counts_only(snapshot)
        }
    }

    pub fn counts_only(snapshot: &UsageSnapshot) -> Self {
        Self {
            rate_limit: snapshot.limit,
            used_requests: snapshot.used,
            remaining_requests: snapshot.remaining,
            window_start: None,
            window_end: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateKeyResponse {
    pub old_api_key: String,
    pub new_api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteClientResponse {
    pub message: String,
    pub client_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub message: String,
    pub remaining_requests: u32,
    pub rate_limit: u32,
    pub client: String,
}
