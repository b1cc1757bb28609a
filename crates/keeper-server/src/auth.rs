//! Bearer-token extractors.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use chrono::{DateTime, Utc};
use keeper_core::identity::User;

use crate::{AppState, error::ApiError};

/// Present in a handler means the request carried a live access token.
#[derive(Debug, Clone)]
pub struct Authenticated {
  pub user:       User,
  pub token:      String,
  pub expires_at: DateTime<Utc>,
}

/// Like [`Authenticated`], but a missing or dead token reads as anonymous
/// instead of failing the request.
#[derive(Debug, Clone)]
pub struct MaybeAuthenticated(pub Option<Authenticated>);

/// The token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Bearer ")
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

async fn resolve(headers: &HeaderMap, state: &AppState) -> Result<Option<Authenticated>, ApiError> {
  let Some(token) = bearer_token(headers) else {
    return Ok(None);
  };
  Ok(state.store.resolve(token).await?.map(|(user, expires_at)| Authenticated {
    user,
    token: token.to_owned(),
    expires_at,
  }))
}

impl FromRequestParts<AppState> for Authenticated {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
    resolve(&parts.headers, state).await?.ok_or(ApiError::Unauthorized)
  }
}

impl FromRequestParts<AppState> for MaybeAuthenticated {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
    Ok(Self(resolve(&parts.headers, state).await?))
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn headers(value: &'static str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
    h
  }

  #[test]
  fn extracts_bearer_token() {
    assert_eq!(bearer_token(&headers("Bearer abc123")), Some("abc123"));
  }

  #[test]
  fn rejects_other_schemes_and_blanks() {
    assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
    assert_eq!(bearer_token(&headers("Bearer ")), None);
    assert_eq!(bearer_token(&HeaderMap::new()), None);
  }
}
