use axum::{
    Extension, Json,
    extract::{Path, State},
};
use tracing::info;
use uuid::Uuid;

use upvote_db::models::VoteAttempt;
use upvote_types::api::VoteResponse;
use upvote_types::models::VoteToggle;

use crate::error::ApiError;
use crate::middleware::Session;
use crate::state::{AppState, with_db};

/// Add the caller's vote if absent, remove it if present.
pub async fn toggle_vote(
    State(state): State<AppState>,
    Path(feature_id): Path<String>,
    Extension(session): Extension<Session>,
) -> Result<Json<VoteResponse>, ApiError> {
    let claims = session.require()?;

    // Anything that is not a UUID cannot name a feature
    let feature_id: Uuid = feature_id.parse().map_err(|_| ApiError::NotFound)?;

    let (uid, fid) = (claims.sub.to_string(), feature_id.to_string());
    let outcome = match with_db(&state, move |db| db.toggle_vote(&uid, &fid)).await? {
        VoteAttempt::Toggled(outcome) => outcome,
        VoteAttempt::FeatureMissing => return Err(ApiError::NotFound),
        // Validly signed token for an account that is gone
        VoteAttempt::VoterMissing => return Err(ApiError::Unauthenticated),
    };

    info!("{} {:?} vote on {}", claims.sub, outcome, feature_id);

    let message = match outcome {
        VoteToggle::Added => "Vote added",
        VoteToggle::Removed => "Vote removed",
    };

    Ok(Json(VoteResponse {
        message: message.to_string(),
        voted: outcome.voted(),
    }))
}
