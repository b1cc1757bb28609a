//! Error types for `keeper-core`.
//!
//! [`AuthError`] and [`ProfileError`] are the only failure shapes that cross
//! the identity backend boundary. Each exposes a stable snake_case
//! [`kind`](AuthError::kind) code, which is also what travels on the wire.

use thiserror::Error;
use uuid::Uuid;

// ─── Identity ────────────────────────────────────────────────────────────────

/// Failure of a sign-in, sign-up, sign-out or session operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
  #[error("invalid login credentials")]
  InvalidCredentials,

  #[error("user already registered")]
  AlreadyRegistered,

  #[error("network error: {0}")]
  Network(String),

  #[error("{0}")]
  Unknown(String),
}

impl AuthError {
  pub fn kind(&self) -> &'static str {
    match self {
      Self::InvalidCredentials => "invalid_credentials",
      Self::AlreadyRegistered => "already_registered",
      Self::Network(_) => "network",
      Self::Unknown(_) => "unknown",
    }
  }

  /// Rebuild an error from its wire `kind` and message.
  pub fn from_kind(kind: &str, message: impl Into<String>) -> Self {
    match kind {
      "invalid_credentials" => Self::InvalidCredentials,
      "already_registered" => Self::AlreadyRegistered,
      "network" => Self::Network(message.into()),
      _ => Self::Unknown(message.into()),
    }
  }
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// Failure of a profile read or write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
  #[error("profile write failed: {0}")]
  WriteFailed(String),

  #[error("no profile for user {0}")]
  NotFound(Uuid),

  #[error("profile conflict: {0}")]
  Conflict(String),

  /// The read could not be completed (transport or decoding failure).
  #[error("profile unavailable: {0}")]
  Transport(String),
}

impl ProfileError {
  pub fn kind(&self) -> &'static str {
    match self {
      Self::WriteFailed(_) => "write_failed",
      Self::NotFound(_) => "not_found",
      Self::Conflict(_) => "conflict",
      Self::Transport(_) => "transport",
    }
  }
}

/// Sign-up is two writes; either one can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignUpError {
  #[error(transparent)]
  Auth(#[from] AuthError),

  /// The user was created but its profile was not.
  #[error(transparent)]
  Profile(#[from] ProfileError),
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown role: {0:?}")]
  UnknownRole(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
