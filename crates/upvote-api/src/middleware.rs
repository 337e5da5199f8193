use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::warn;
use uuid::Uuid;

use upvote_types::api::Claims;

use crate::error::ApiError;
use crate::state::AppState;

const TOKEN_LIFETIME_DAYS: i64 = 30;

/// Authentication context for one request: the caller's claims, or anonymous.
#[derive(Debug, Clone, Default)]
pub struct Session(Option<Claims>);

impl Session {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn authenticated(claims: Claims) -> Self {
        Self(Some(claims))
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|c| c.sub)
    }

    pub fn require(&self) -> Result<&Claims, ApiError> {
        self.0.as_ref().ok_or(ApiError::Unauthenticated)
    }
}

/// Resolve the bearer token (if any) into a [`Session`] extension. Never
/// rejects: a missing or invalid token yields an anonymous session
/// and handlers decide whether that is acceptable.
pub async fn resolve_session(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let session = match req.headers().typed_get::<Authorization<Bearer>>() {
        Some(bearer) => match verify_token(&state.jwt_secret, bearer.token()) {
            Ok(claims) => Session::authenticated(claims),
            Err(e) => {
                warn!("Rejected bearer token: {}", e);
                Session::anonymous()
            }
        },
        None => Session::anonymous(),
    };

    req.extensions_mut().insert(session);
    next.run(req).await
}

pub fn create_token(secret: &str, user_id: Uuid, name: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roundtrip_and_wrong_secret() {
        let id = Uuid::new_v4();
        let token = create_token("secret-a", id, "Ada").unwrap();

        let claims = verify_token("secret-a", &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.name, "Ada");

        assert!(verify_token("secret-b", &token).is_err());
    }

    #[test]
    fn anonymous_session_requires_login() {
        let session = Session::anonymous();
        assert!(session.user_id().is_none());
        assert!(matches!(session.require(), Err(ApiError::Unauthenticated)));
    }
}
