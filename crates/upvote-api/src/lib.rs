pub mod auth;
pub mod error;
pub mod features;
pub mod middleware;
pub mod rows;
pub mod state;
pub mod validation;
pub mod votes;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::method_not_allowed;
use crate::middleware::resolve_session;
use crate::state::AppState;

/// Full HTTP surface. Every route sees a resolved `Session`; handlers that
/// need a signed-in caller reject anonymous ones themselves.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/auth/signup", post(auth::sign_up).fallback(method_not_allowed))
        .route("/auth/signin", post(auth::sign_in).fallback(method_not_allowed))
        .route("/auth/session", get(auth::session).fallback(method_not_allowed))
        .route(
            "/features",
            get(features::list_features)
                .post(features::create_feature)
                .fallback(method_not_allowed),
        )
        .route(
            "/features/{id}/vote",
            post(votes::toggle_vote).fallback(method_not_allowed),
        )
        .layer(axum_middleware::from_fn_with_state(state.clone(), resolve_session))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
