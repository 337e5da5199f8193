//! Database row types — these map directly to SQLite rows.
//! Distinct from upvote-types API models to keep the DB layer independent.

use upvote_types::models::{FeatureStatus, VoteToggle};

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password: String,
    pub created_at: String,
}

pub struct FeatureRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub creator_id: String,
    pub created_at: String,
}

/// A feature as returned by the ranked listing, with its live vote count.
pub struct FeatureListRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub creator_id: String,
    pub creator_name: String,
    pub created_at: String,
    pub vote_count: i64,
    /// `None` when the listing had no viewer.
    pub voted: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureFilter {
    pub status: Option<FeatureStatus>,
    /// Case-insensitive substring matched against title or description.
    pub search: Option<String>,
}

pub struct FeaturePage {
    pub rows: Vec<FeatureListRow>,
    /// Number of features matching the filter, ignoring pagination.
    pub total: u64,
}

/// What happened to a toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAttempt {
    Toggled(VoteToggle),
    FeatureMissing,
    /// The voter's account no longer exists.
    VoterMissing,
}
