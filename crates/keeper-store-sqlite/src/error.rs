//! Error type for `keeper-store-sqlite`.

use keeper_core::{AuthError, ProfileError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] keeper_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("password hashing failed: {0}")]
  Hash(String),

  #[error("email already registered: {0}")]
  EmailTaken(String),

  /// Unknown email or wrong password; deliberately indistinguishable.
  #[error("invalid login credentials")]
  InvalidCredentials,

  #[error("invalid or expired token")]
  InvalidToken,

  #[error("no profile for user {0}")]
  ProfileNotFound(uuid::Uuid),

  #[error("user {0} already has a profile")]
  ProfileExists(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  /// Whether the underlying SQLite failure was a UNIQUE or PRIMARY KEY
  /// constraint.
  pub(crate) fn is_unique_violation(&self) -> bool {
    let Self::Database(tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _))) =
      self
    else {
      return false;
    };
    matches!(
      e.extended_code,
      rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
  }
}

impl From<Error> for AuthError {
  fn from(e: Error) -> Self {
    match e {
      Error::EmailTaken(_) => Self::AlreadyRegistered,
      Error::InvalidCredentials | Error::InvalidToken => Self::InvalidCredentials,
      other => Self::Unknown(other.to_string()),
    }
  }
}

/// Write-side mapping. Reads map every failure to
/// [`ProfileError::Transport`] instead.
impl From<Error> for ProfileError {
  fn from(e: Error) -> Self {
    match e {
      Error::ProfileNotFound(id) => Self::NotFound(id),
      Error::ProfileExists(id) => Self::Conflict(format!("user {id} already has a profile")),
      other => Self::WriteFailed(other.to_string()),
    }
  }
}
