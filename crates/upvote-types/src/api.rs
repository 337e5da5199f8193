use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::FeatureStatus;

// -- JWT Claims --

/// Bearer token claims. `sub` is the user id the request acts as.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub name: String,
    pub token: String,
}

// -- Features --

/// Both fields are optional on the wire so a missing field is reported as a
/// validation failure rather than a deserialization failure.
#[derive(Debug, Default, Deserialize)]
pub struct CreateFeatureRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Raw listing query. Everything arrives as text and is normalized by the
/// handler.
#[derive(Debug, Default, Deserialize)]
pub struct ListFeaturesQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: FeatureStatus,
    pub creator_id: Uuid,
    pub creator_name: String,
    pub created_at: DateTime<Utc>,
    pub vote_count: u64,
    /// Present only when the listing was requested with a session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voted: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub pages: u64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeatureListResponse {
    pub features: Vec<FeatureView>,
    pub pagination: Pagination,
}

// -- Votes --

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteResponse {
    pub message: String,
    pub voted: bool,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}
