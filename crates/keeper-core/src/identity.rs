//! Users, sessions and session-change events as reported by the identity
//! backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The minimal identity record. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:             Uuid,
  pub email:          String,
  pub email_verified: bool,
}

/// A live authenticated connection.
///
/// The tokens are opaque to everything except the backend that issued them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub access_token:  String,
  pub refresh_token: String,
  pub expires_at:    DateTime<Utc>,
  pub user:          User,
}

impl Session {
  pub fn user_id(&self) -> Uuid { self.user.id }

  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    self.expires_at <= now
  }

  pub fn is_expired(&self) -> bool { self.is_expired_at(Utc::now()) }
}

// Tokens stay out of logs.
impl std::fmt::Debug for Session {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Session")
      .field("expires_at", &self.expires_at)
      .field("user", &self.user)
      .finish_non_exhaustive()
  }
}

/// Result of a successful identity sign-up.
///
/// `session` is `None` when the backend requires the address to be confirmed
/// before the first sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpOutcome {
  pub user:    User,
  pub session: Option<Session>,
}

/// A session change pushed by the identity backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
  SignedIn(Session),
  TokenRefreshed(Session),
  SignedOut,
  /// The backend found the current session expired or revoked.
  Expired,
}

impl AuthEvent {
  /// The session carried by the event, if it establishes one.
  pub fn session(&self) -> Option<&Session> {
    match self {
      Self::SignedIn(s) | Self::TokenRefreshed(s) => Some(s),
      Self::SignedOut | Self::Expired => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  fn session(expires_at: DateTime<Utc>) -> Session {
    Session {
      access_token:  "secret-access".into(),
      refresh_token: "secret-refresh".into(),
      expires_at,
      user: User {
        id:             Uuid::new_v4(),
        email:          "employee@hexaware.com".into(),
        email_verified: true,
      },
    }
  }

  #[test]
  fn expiry_is_inclusive() {
    let now = Utc::now();
    assert!(session(now).is_expired_at(now));
    assert!(!session(now + Duration::seconds(1)).is_expired_at(now));
  }

  #[test]
  fn debug_hides_tokens() {
    let rendered = format!("{:?}", session(Utc::now()));
    assert!(!rendered.contains("secret"));
    assert!(rendered.contains("employee@hexaware.com"));
  }

  #[test]
  fn only_sign_in_and_refresh_carry_a_session() {
    let s = session(Utc::now());
    assert!(AuthEvent::SignedIn(s.clone()).session().is_some());
    assert!(AuthEvent::TokenRefreshed(s).session().is_some());
    assert!(AuthEvent::SignedOut.session().is_none());
    assert!(AuthEvent::Expired.session().is_none());
  }
}
