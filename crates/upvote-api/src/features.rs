use axum::{
    Extension, Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use upvote_db::models::{FeatureFilter, FeatureRow};
use upvote_types::api::{CreateFeatureRequest, FeatureListResponse, ListFeaturesQuery, Pagination};
use upvote_types::models::FeatureStatus;

use crate::error::ApiError;
use crate::middleware::Session;
use crate::rows;
use crate::state::{AppState, with_db};
use crate::validation::validate_feature;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Listing request after normalization: page and limit are always >= 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub status: Option<FeatureStatus>,
    pub search: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl ListParams {
    pub fn from_query(query: ListFeaturesQuery) -> Result<Self, ApiError> {
        let status = match non_empty(query.status) {
            Some(raw) => Some(
                raw.parse::<FeatureStatus>()
                    .map_err(|_| ApiError::validation("Invalid status"))?,
            ),
            None => None,
        };

        Ok(Self {
            status,
            search: non_empty(query.search),
            page: positive_or(query.page.as_deref(), DEFAULT_PAGE),
            limit: positive_or(query.limit.as_deref(), DEFAULT_LIMIT).min(MAX_LIMIT),
        })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.filter(|s| !s.is_empty())
}

/// Missing or unparseable input falls back to `default`; anything below 1 is
/// clamped to 1.
fn positive_or(raw: Option<&str>, default: u32) -> u32 {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => match s.parse::<i64>() {
            Ok(n) => n.clamp(1, i64::from(u32::MAX)) as u32,
            Err(_) => default,
        },
        None => default,
    }
}

pub fn page_count(total: u64, limit: u32) -> u64 {
    total.div_ceil(u64::from(limit.max(1)))
}

pub async fn list_features(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<ListFeaturesQuery>,
) -> Result<Json<FeatureListResponse>, ApiError> {
    let params = ListParams::from_query(query)?;
    let viewer = session.user_id().map(|id| id.to_string());

    let filter = FeatureFilter {
        status: params.status,
        search: params.search.clone(),
    };
    let (limit, offset) = (params.limit, params.offset());

    let page = with_db(&state, move |db| {
        db.list_features(&filter, viewer.as_deref(), limit, offset)
    })
    .await?;

    Ok(Json(FeatureListResponse {
        features: page.rows.into_iter().map(rows::feature_view).collect(),
        pagination: Pagination {
            total: page.total,
            pages: page_count(page.total, params.limit),
            page: params.page,
            limit: params.limit,
        },
    }))
}

pub async fn create_feature(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    body: Result<Json<CreateFeatureRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = session.require()?;
    let Json(req) = body.map_err(|_| ApiError::validation("Invalid request body"))?;

    let title = req.title.as_deref().unwrap_or_default().trim().to_string();
    let description = req.description.as_deref().unwrap_or_default().trim().to_string();
    if let Some(problem) = validate_feature(&title, &description) {
        return Err(ApiError::validation(problem));
    }

    let created_at = rows::now_timestamp();
    let row = FeatureRow {
        id: Uuid::new_v4().to_string(),
        title,
        description,
        status: FeatureStatus::default().as_str().to_string(),
        creator_id: claims.sub.to_string(),
        created_at,
    };

    let (inserted, row) = with_db(&state, move |db| {
        let inserted = db.insert_feature(&row)?;
        Ok((inserted, row))
    })
    .await?;
    if !inserted {
        return Err(ApiError::Unauthenticated);
    }

    debug!("Feature {} created by {}", row.id, claims.sub);

    Ok((StatusCode::CREATED, Json(rows::feature(row))))
}
