//! Error types and axum `IntoResponse` implementation.
//!
//! Every failure is rendered as `{"error": <kind>, "message": <text>}`, where
//! `kind` is the same snake_case code the core error types expose.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use keeper_core::{AuthError, ProfileError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("missing or invalid bearer token")]
  Unauthorized,
  #[error("not allowed to access this resource")]
  Forbidden,
  #[error("no route matches {0}")]
  RouteNotFound(String),
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error(transparent)]
  Auth(#[from] AuthError),
  #[error(transparent)]
  Profile(#[from] ProfileError),
  #[error("store error: {0}")]
  Store(#[from] keeper_store_sqlite::Error),
}

/// The JSON error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
  pub error:   String,
  pub message: String,
}

impl ApiError {
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Unauthorized => "unauthorized",
      Self::Forbidden => "forbidden",
      Self::RouteNotFound(_) => "not_found",
      Self::BadRequest(_) => "bad_request",
      Self::Auth(e) => e.kind(),
      Self::Profile(e) => e.kind(),
      Self::Store(_) => "internal",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::Unauthorized => StatusCode::UNAUTHORIZED,
      Self::Forbidden => StatusCode::FORBIDDEN,
      Self::RouteNotFound(_) => StatusCode::NOT_FOUND,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
      Self::Auth(AuthError::AlreadyRegistered) => StatusCode::CONFLICT,
      Self::Auth(AuthError::Network(_)) => StatusCode::BAD_GATEWAY,
      Self::Auth(AuthError::Unknown(_)) => StatusCode::INTERNAL_SERVER_ERROR,
      Self::Profile(ProfileError::NotFound(_)) => StatusCode::NOT_FOUND,
      Self::Profile(ProfileError::Conflict(_)) => StatusCode::CONFLICT,
      Self::Profile(ProfileError::WriteFailed(_)) => StatusCode::UNPROCESSABLE_ENTITY,
      Self::Profile(ProfileError::Transport(_)) => StatusCode::SERVICE_UNAVAILABLE,
      Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(error = %self, "request failed");
    }
    let body = ErrorBody { error: self.kind().to_owned(), message: self.to_string() };
    let mut res = (status, Json(body)).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer realm=\"keeper\""));
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn core_errors_keep_their_kind() {
    let e = ApiError::from(AuthError::AlreadyRegistered);
    assert_eq!(e.kind(), "already_registered");
    assert_eq!(e.status(), StatusCode::CONFLICT);

    let e = ApiError::from(ProfileError::Conflict("dup".into()));
    assert_eq!(e.kind(), "conflict");
    assert_eq!(e.status(), StatusCode::CONFLICT);
  }

  #[test]
  fn unauthorized_carries_a_challenge() {
    let res = ApiError::Unauthorized.into_response();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));
  }
}
