//! Conversions from database rows to wire models. Rows written by this
//! service always parse; anything else is logged and defaulted rather than
//! failing the whole response.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use upvote_db::models::{FeatureListRow, FeatureRow, UserRow};
use upvote_types::api::FeatureView;
use upvote_types::models::{Feature, FeatureStatus, User};

pub fn feature(row: FeatureRow) -> Feature {
    Feature {
        id: parse_uuid("feature id", &row.id),
        title: row.title,
        description: row.description,
        status: parse_status(&row.status),
        creator_id: parse_uuid("creator id", &row.creator_id),
        created_at: parse_timestamp(&row.created_at),
    }
}

pub fn feature_view(row: FeatureListRow) -> FeatureView {
    FeatureView {
        id: parse_uuid("feature id", &row.id),
        title: row.title,
        description: row.description,
        status: parse_status(&row.status),
        creator_id: parse_uuid("creator id", &row.creator_id),
        creator_name: row.creator_name,
        created_at: parse_timestamp(&row.created_at),
        vote_count: row.vote_count.max(0) as u64,
        voted: row.voted,
    }
}

pub fn user(row: UserRow) -> User {
    User {
        id: parse_uuid("user id", &row.id),
        email: row.email,
        name: row.name,
        created_at: parse_timestamp(&row.created_at),
    }
}

fn parse_uuid(what: &str, raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

fn parse_status(raw: &str) -> FeatureStatus {
    raw.parse().unwrap_or_else(|e| {
        warn!("{}", e);
        FeatureStatus::default()
    })
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::<Utc>::default()
        })
}

/// Timestamp format used for every row this service writes. Fixed width, so
/// lexical order in SQLite matches chronological order.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
