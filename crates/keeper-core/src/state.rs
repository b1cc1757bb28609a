//! The authentication snapshot read by the route guard and dashboard router,
//! and the state machine it moves through.

use serde::Serialize;

use crate::{
  identity::{Session, User},
  profile::Profile,
};

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Who is signed in and in what role, as of one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
  pub session:         Option<Session>,
  pub user:            Option<User>,
  pub profile:         Option<Profile>,
  /// True until the startup session probe has completed.
  pub loading:         bool,
  /// True while a profile fetch for the current user is in flight.
  pub profile_pending: bool,
}

impl AuthState {
  /// The state of a client that has not yet probed for a session.
  pub fn initializing() -> Self {
    Self {
      session:         None,
      user:            None,
      profile:         None,
      loading:         true,
      profile_pending: false,
    }
  }

  pub fn anonymous() -> Self {
    Self { loading: false, ..Self::initializing() }
  }

  /// Signed in, profile not yet known.
  pub fn authenticated(session: Session) -> Self {
    Self {
      user: Some(session.user.clone()),
      session: Some(session),
      profile: None,
      loading: false,
      profile_pending: false,
    }
  }

  pub fn with_profile(mut self, profile: Profile) -> Self {
    self.profile = Some(profile);
    self.profile_pending = false;
    self
  }

  pub fn user_id(&self) -> Option<uuid::Uuid> { self.user.as_ref().map(|u| u.id) }

  pub fn phase(&self) -> AuthPhase {
    match (self.loading, &self.session, &self.profile) {
      (true, None, _) => AuthPhase::Initializing,
      (_, None, _) => AuthPhase::Anonymous,
      (_, Some(_), None) => AuthPhase::AuthenticatedNoProfile,
      (_, Some(_), Some(_)) => AuthPhase::AuthenticatedWithProfile,
    }
  }
}

impl Default for AuthState {
  fn default() -> Self { Self::initializing() }
}

// ─── State machine ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
  Initializing,
  Anonymous,
  AuthenticatedNoProfile,
  AuthenticatedWithProfile,
}

impl AuthPhase {
  pub fn is_authenticated(self) -> bool {
    matches!(
      self,
      Self::AuthenticatedNoProfile | Self::AuthenticatedWithProfile
    )
  }

  /// Whether moving from `self` to `next` is a legal transition. Staying in
  /// the same phase is always legal.
  ///
  /// Initializing may jump straight to an authenticated phase only when the
  /// startup probe restores an existing session. A profile, once loaded, is
  /// only dropped by leaving the session altogether.
  pub fn can_transition_to(self, next: Self) -> bool {
    use AuthPhase::*;
    if self == next {
      return true;
    }
    matches!(
      (self, next),
      (Initializing, _)
        | (_, Anonymous)
        | (Anonymous, AuthenticatedNoProfile)
        | (AuthenticatedNoProfile, AuthenticatedWithProfile)
    )
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::{AuthPhase::*, *};

  fn session() -> Session {
    Session {
      access_token:  "a".into(),
      refresh_token: "r".into(),
      expires_at:    Utc::now() + chrono::Duration::hours(1),
      user:          User {
        id:             Uuid::new_v4(),
        email:          "employee@hexaware.com".into(),
        email_verified: true,
      },
    }
  }

  #[test]
  fn phase_follows_fields() {
    assert_eq!(AuthState::initializing().phase(), Initializing);
    assert_eq!(AuthState::anonymous().phase(), Anonymous);
    let s = session();
    let authed = AuthState::authenticated(s.clone());
    assert_eq!(authed.phase(), AuthenticatedNoProfile);
    assert_eq!(authed.user_id(), Some(s.user_id()));
  }

  #[test]
  fn legal_edges() {
    assert!(Initializing.can_transition_to(Anonymous));
    assert!(Anonymous.can_transition_to(AuthenticatedNoProfile));
    assert!(AuthenticatedNoProfile.can_transition_to(AuthenticatedWithProfile));
    assert!(AuthenticatedNoProfile.can_transition_to(Anonymous));
    assert!(AuthenticatedWithProfile.can_transition_to(Anonymous));
    assert!(Anonymous.can_transition_to(Anonymous));
  }

  #[test]
  fn illegal_edges() {
    assert!(!Anonymous.can_transition_to(Initializing));
    assert!(!Anonymous.can_transition_to(AuthenticatedWithProfile));
    assert!(!AuthenticatedWithProfile.can_transition_to(AuthenticatedNoProfile));
    assert!(!AuthenticatedNoProfile.can_transition_to(Initializing));
  }
}
