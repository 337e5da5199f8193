use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use upvote_types::api::{AuthResponse, SignInRequest, SignUpRequest};

use crate::error::ApiError;
use crate::middleware::{Session, create_token};
use crate::rows;
use crate::state::{AppState, with_db};
use crate::validation::{validate_email, validate_name, validate_password};

pub async fn sign_up(
    State(state): State<AppState>,
    body: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(|_| ApiError::validation("Invalid request body"))?;

    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();

    if let Some(problem) = validate_name(&name)
        .or_else(|| validate_email(&email))
        .or_else(|| validate_password(&req.password))
    {
        return Err(ApiError::validation(problem));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let user_id = Uuid::new_v4();
    let created_at = rows::now_timestamp();

    let created = {
        let (id, email, name) = (user_id.to_string(), email.clone(), name.clone());
        with_db(&state, move |db| {
            db.create_user(&id, &email, &name, &password_hash, &created_at)
        })
        .await?
    };
    if !created {
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    info!("New account {} ({})", user_id, email);

    let token = create_token(&state.jwt_secret, user_id, &name)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id,
            name,
            token,
        }),
    ))
}

pub async fn sign_in(
    State(state): State<AppState>,
    body: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(req) = body.map_err(|_| ApiError::validation("Invalid request body"))?;
    let email = req.email.trim().to_lowercase();

    let user = with_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("stored hash for {} is unreadable: {}", user.id, e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    let user_id: Uuid = user.id.parse().map_err(anyhow::Error::from)?;
    let token = create_token(&state.jwt_secret, user_id, &user.name)?;

    Ok(Json(AuthResponse {
        user_id,
        name: user.name,
        token,
    }))
}

/// The account behind the current bearer token.
pub async fn session(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = session.require()?.sub.to_string();

    let user = with_db(&state, move |db| db.get_user_by_id(&user_id))
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    Ok(Json(rows::user(user)))
}
