//! The route guard: may the current identity see a protected view?

use serde::{Deserialize, Serialize};

use crate::{role::RoleSet, state::AuthState};

/// Outcome of guarding one protected view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
  Render,
  RedirectToLogin,
  RedirectToUnauthorized,
  /// Identity is still indeterminate; show a placeholder, decide nothing.
  RenderLoading,
}

impl Decision {
  /// Where a redirecting decision sends the client.
  pub fn redirect_target(self) -> Option<&'static str> {
    match self {
      Self::RedirectToLogin => Some(crate::routes::LOGIN),
      Self::RedirectToUnauthorized => Some(crate::routes::UNAUTHORIZED),
      Self::Render | Self::RenderLoading => None,
    }
  }
}

/// Decide whether `state` may see a view restricted to `allowed`.
///
/// The checks run in a fixed order:
///
/// 1. still loading → [`Decision::RenderLoading`] (no login flash at startup)
/// 2. no session → [`Decision::RedirectToLogin`]
/// 3. no profile → [`Decision::RedirectToLogin`]; a missing profile is an
///    incomplete identity, not a role mismatch
/// 4. inactive profile → [`Decision::RedirectToUnauthorized`]
/// 5. role not in `allowed` → [`Decision::RedirectToUnauthorized`]
/// 6. otherwise [`Decision::Render`]
pub fn authorize(state: &AuthState, allowed: RoleSet) -> Decision {
  if state.loading {
    return Decision::RenderLoading;
  }
  if state.session.is_none() {
    return Decision::RedirectToLogin;
  }
  let Some(profile) = &state.profile else {
    return Decision::RedirectToLogin;
  };
  if !profile.is_active || !allowed.contains(profile.role) {
    return Decision::RedirectToUnauthorized;
  }
  Decision::Render
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, Utc};
  use strum::IntoEnumIterator as _;
  use uuid::Uuid;

  use super::*;
  use crate::{
    identity::{Session, User},
    profile::{NewProfile, Profile, ProfileSeed},
    role::{Role, resolve_role},
  };

  fn session(email: &str) -> Session {
    Session {
      access_token:  "a".into(),
      refresh_token: "r".into(),
      expires_at:    Utc::now() + Duration::hours(1),
      user:          User {
        id:             Uuid::new_v4(),
        email:          email.into(),
        email_verified: true,
      },
    }
  }

  fn profile_for(session: &Session, role: Role) -> Profile {
    NewProfile::seeded(session.user_id(), &session.user.email, role, ProfileSeed::default())
      .into_profile(Utc::now())
  }

  fn signed_in_as(email: &str) -> AuthState {
    let s = session(email);
    let p = profile_for(&s, resolve_role(email));
    AuthState::authenticated(s).with_profile(p)
  }

  #[test]
  fn admin_sees_admin_dashboard() {
    let state = signed_in_as("admin@hexaware.com");
    assert_eq!(authorize(&state, RoleSet::only(Role::Admin)), Decision::Render);
  }

  #[test]
  fn admin_is_turned_away_from_security_dashboard() {
    let state = signed_in_as("admin@hexaware.com");
    assert_eq!(
      authorize(&state, RoleSet::only(Role::Security)),
      Decision::RedirectToUnauthorized
    );
  }

  #[test]
  fn loading_wins_over_everything() {
    let mut state = signed_in_as("admin@hexaware.com");
    state.loading = true;
    assert_eq!(authorize(&state, RoleSet::only(Role::Admin)), Decision::RenderLoading);
    assert_eq!(
      authorize(&AuthState::initializing(), RoleSet::EMPTY),
      Decision::RenderLoading
    );
  }

  #[test]
  fn authenticated_without_profile_goes_to_login() {
    let state = AuthState::authenticated(session("admin@hexaware.com"));
    assert_eq!(authorize(&state, RoleSet::only(Role::Admin)), Decision::RedirectToLogin);
  }

  #[test]
  fn inactive_profile_is_unauthorized() {
    let mut state = signed_in_as("nurse@hexaware.com");
    state.profile.as_mut().unwrap().is_active = false;
    assert_eq!(
      authorize(&state, RoleSet::only(Role::HexaNurse)),
      Decision::RedirectToUnauthorized
    );
  }

  #[test]
  fn many_roles_per_route() {
    let allowed = RoleSet::of(&[Role::Admin, Role::Security]);
    assert_eq!(authorize(&signed_in_as("security@hexaware.com"), allowed), Decision::Render);
    assert_eq!(authorize(&signed_in_as("admin@hexaware.com"), allowed), Decision::Render);
    assert_eq!(
      authorize(&signed_in_as("someone@example.com"), allowed),
      Decision::RedirectToUnauthorized
    );
  }

  /// Every combination of loading × session × profile role × allowed set
  /// yields exactly the decision the ordering prescribes.
  #[test]
  fn exhaustive_decision_table() {
    let allowed_sets: Vec<RoleSet> = std::iter::once(RoleSet::EMPTY)
      .chain(Role::iter().map(RoleSet::only))
      .chain([
        RoleSet::of(&[Role::Admin, Role::HexaNurse]),
        Role::iter().collect(),
      ])
      .collect();

    let roles: Vec<Option<Role>> =
      std::iter::once(None).chain(Role::iter().map(Some)).collect();

    for loading in [true, false] {
      for has_session in [true, false] {
        for role in &roles {
          for allowed in &allowed_sets {
            let s = session("x@hexaware.com");
            let state = AuthState {
              session: has_session.then(|| s.clone()),
              user: has_session.then(|| s.user.clone()),
              profile: role.map(|r| profile_for(&s, r)),
              loading,
              profile_pending: false,
            };

            let expected = if loading {
              Decision::RenderLoading
            } else if !has_session || role.is_none() {
              Decision::RedirectToLogin
            } else if allowed.contains(role.unwrap()) {
              Decision::Render
            } else {
              Decision::RedirectToUnauthorized
            };

            assert_eq!(authorize(&state, *allowed), expected, "{state:?} {allowed:?}");
            assert_eq!(authorize(&state, *allowed), authorize(&state, *allowed));
          }
        }
      }
    }
  }

  #[test]
  fn redirect_targets() {
    assert_eq!(Decision::RedirectToLogin.redirect_target(), Some("/login"));
    assert_eq!(Decision::RedirectToUnauthorized.redirect_target(), Some("/unauthorized"));
    assert_eq!(Decision::Render.redirect_target(), None);
    assert_eq!(Decision::RenderLoading.redirect_target(), None);
  }
}
