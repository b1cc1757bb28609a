//! `/auth/*` — sign-up, token issue and refresh, sign-out, current user.

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode},
};
use keeper_core::{
  AuthError,
  identity::{Session, SignUpOutcome, User},
};
use serde::Deserialize;
use tracing::info;

use crate::{
  AppState,
  auth::{Authenticated, bearer_token},
  error::ApiError,
};

#[derive(Debug, Deserialize)]
pub struct Credentials {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
  pub refresh_token: String,
}

fn validate(creds: &Credentials) -> Result<(), ApiError> {
  if creds.email.trim().is_empty() || !creds.email.contains('@') {
    return Err(ApiError::BadRequest("a valid email address is required".into()));
  }
  if creds.password.is_empty() {
    return Err(ApiError::BadRequest("a password is required".into()));
  }
  Ok(())
}

/// POST /auth/signup: create the identity and sign it straight in. The
/// profile is a separate call.
pub async fn signup(
  State(state): State<AppState>,
  Json(creds): Json<Credentials>,
) -> Result<(StatusCode, Json<SignUpOutcome>), ApiError> {
  validate(&creds)?;
  let user = state
    .store
    .register(&creds.email, &creds.password)
    .await
    .map_err(AuthError::from)?;
  let session = state.store.open_session(user.clone()).await?;
  Ok((StatusCode::CREATED, Json(SignUpOutcome { user, session: Some(session) })))
}

/// POST /auth/token (password grant)
pub async fn token(
  State(state): State<AppState>,
  Json(creds): Json<Credentials>,
) -> Result<Json<Session>, ApiError> {
  let session = state
    .store
    .authenticate(&creds.email, &creds.password)
    .await
    .map_err(AuthError::from)?;
  info!(user_id = %session.user_id(), "issued session");
  Ok(Json(session))
}

/// POST /auth/refresh
pub async fn refresh(
  State(state): State<AppState>,
  Json(req): Json<RefreshRequest>,
) -> Result<Json<Session>, ApiError> {
  let session = state
    .store
    .refresh(&req.refresh_token)
    .await
    .map_err(AuthError::from)?;
  Ok(Json(session))
}

/// POST /auth/logout: revoke the presented token. Revoking a dead token
/// succeeds.
pub async fn logout(
  State(state): State<AppState>,
  headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
  let token = bearer_token(&headers).ok_or(ApiError::Unauthorized)?;
  state.store.revoke(token).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/user
pub async fn user(auth: Authenticated) -> Json<User> { Json(auth.user) }
