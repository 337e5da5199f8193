use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: FeatureStatus,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of a feature request. New requests always start as `Open`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    #[default]
    Open,
    Planned,
    InProgress,
    Done,
}

impl FeatureStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureStatus::Open => "open",
            FeatureStatus::Planned => "planned",
            FeatureStatus::InProgress => "in_progress",
            FeatureStatus::Done => "done",
        }
    }
}

impl fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown feature status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for FeatureStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(FeatureStatus::Open),
            "planned" => Ok(FeatureStatus::Planned),
            "in_progress" => Ok(FeatureStatus::InProgress),
            "done" => Ok(FeatureStatus::Done),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Result of toggling a (user, feature) vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteToggle {
    Added,
    Removed,
}

impl VoteToggle {
    pub fn voted(self) -> bool {
        matches!(self, VoteToggle::Added)
    }
}
