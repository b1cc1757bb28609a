//! The static route table and navigation over it.
//!
//! | Path | Access |
//! |------|--------|
//! | `/` | public |
//! | `/login` | public |
//! | `/unauthorized` | public |
//! | `/admin-dashboard` | admin |
//! | `/employee-dashboard` | employee |
//! | `/hexanurse-dashboard` | hexanurse |
//! | `/security-dashboard` | security |

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;

use crate::{
  dashboard::{DashboardKind, select_dashboard},
  guard::{Decision, authorize},
  role::{Role, RoleSet},
  state::AuthState,
};

pub const HOME: &str = "/";
pub const LOGIN: &str = "/login";
pub const UNAUTHORIZED: &str = "/unauthorized";

/// Who may see a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "roles", rename_all = "snake_case")]
pub enum Access {
  Public,
  Protected(RoleSet),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
  pub path:   String,
  pub access: Access,
}

/// What a navigation attempt resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Navigation {
  Render { path: String },
  RenderLoading { path: String },
  Redirect { to: &'static str, decision: Decision },
  NotFound { path: String },
}

// ─── Table ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RouteTable {
  routes: Vec<Route>,
}

impl RouteTable {
  pub fn new() -> Self { Self { routes: Vec::new() } }

  /// The application's routes: three public pages and one dashboard per
  /// role.
  pub fn standard() -> Self {
    let mut table = Self::new().public(HOME).public(LOGIN).public(UNAUTHORIZED);
    for role in Role::iter() {
      table = table.protected(select_dashboard(role).path(), RoleSet::only(role));
    }
    table
  }

  pub fn public(self, path: &str) -> Self { self.with(path, Access::Public) }

  pub fn protected(self, path: &str, roles: RoleSet) -> Self {
    self.with(path, Access::Protected(roles))
  }

  fn with(mut self, path: &str, access: Access) -> Self {
    let path = normalize(path);
    self.routes.retain(|r| r.path != path);
    self.routes.push(Route { path, access });
    self
  }

  pub fn routes(&self) -> &[Route] { &self.routes }

  pub fn get(&self, path: &str) -> Option<&Route> {
    let path = normalize(path);
    self.routes.iter().find(|r| r.path == path)
  }

  /// Resolve a navigation to `path` for the given identity.
  pub fn navigate(&self, path: &str, state: &AuthState) -> Navigation {
    let Some(route) = self.get(path) else {
      return Navigation::NotFound { path: path.to_owned() };
    };
    let decision = match route.access {
      Access::Public => Decision::Render,
      Access::Protected(roles) => authorize(state, roles),
    };
    match decision {
      Decision::Render => Navigation::Render { path: route.path.clone() },
      Decision::RenderLoading => Navigation::RenderLoading { path: route.path.clone() },
      Decision::RedirectToLogin | Decision::RedirectToUnauthorized => {
        Navigation::Redirect {
          to: decision.redirect_target().unwrap_or(LOGIN),
          decision,
        }
      }
    }
  }
}

impl Default for RouteTable {
  fn default() -> Self { Self::standard() }
}

/// Strip the query string, fragment and trailing slash; `""` becomes `/`.
fn normalize(path: &str) -> String {
  let path = path.split(['?', '#']).next().unwrap_or_default();
  let trimmed = path.trim_end_matches('/');
  if trimmed.is_empty() {
    HOME.to_owned()
  } else if trimmed.starts_with('/') {
    trimmed.to_owned()
  } else {
    format!("/{trimmed}")
  }
}

/// Where a freshly signed-in user belongs: their role's dashboard, once both
/// the user and the profile are known.
pub fn landing_path(state: &AuthState) -> Option<&'static str> {
  state.user.as_ref()?;
  let profile = state.profile.as_ref()?;
  Some(DashboardKind::for_role(profile.role).path())
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, Utc};
  use uuid::Uuid;

  use super::*;
  use crate::{
    identity::{Session, User},
    profile::{NewProfile, ProfileSeed},
  };

  fn signed_in(role: Role) -> AuthState {
    let session = Session {
      access_token:  "a".into(),
      refresh_token: "r".into(),
      expires_at:    Utc::now() + Duration::hours(1),
      user:          User {
        id:             Uuid::new_v4(),
        email:          "someone@hexaware.com".into(),
        email_verified: true,
      },
    };
    let profile = NewProfile::seeded(session.user_id(), "someone@hexaware.com", role, ProfileSeed::default())
      .into_profile(Utc::now());
    AuthState::authenticated(session).with_profile(profile)
  }

  #[test]
  fn standard_table_shape() {
    let table = RouteTable::standard();
    assert_eq!(table.routes().len(), 7);
    let public: Vec<_> = table
      .routes()
      .iter()
      .filter(|r| r.access == Access::Public)
      .map(|r| r.path.as_str())
      .collect();
    assert_eq!(public, vec!["/", "/login", "/unauthorized"]);
    assert_eq!(
      table.get("/hexanurse-dashboard").unwrap().access,
      Access::Protected(RoleSet::only(Role::HexaNurse))
    );
  }

  #[test]
  fn public_routes_render_for_anyone() {
    let table = RouteTable::standard();
    for state in [AuthState::initializing(), AuthState::anonymous(), signed_in(Role::Admin)] {
      assert_eq!(
        table.navigate("/login", &state),
        Navigation::Render { path: "/login".into() }
      );
    }
  }

  #[test]
  fn protected_routes_go_through_the_guard() {
    let table = RouteTable::standard();
    assert_eq!(
      table.navigate("/admin-dashboard", &AuthState::anonymous()),
      Navigation::Redirect { to: "/login", decision: Decision::RedirectToLogin }
    );
    assert_eq!(
      table.navigate("/admin-dashboard", &signed_in(Role::Employee)),
      Navigation::Redirect {
        to:       "/unauthorized",
        decision: Decision::RedirectToUnauthorized,
      }
    );
    assert_eq!(
      table.navigate("/admin-dashboard/", &signed_in(Role::Admin)),
      Navigation::Render { path: "/admin-dashboard".into() }
    );
    assert_eq!(
      table.navigate("/security-dashboard", &AuthState::initializing()),
      Navigation::RenderLoading { path: "/security-dashboard".into() }
    );
  }

  #[test]
  fn unknown_paths_are_not_found() {
    let table = RouteTable::standard();
    assert_eq!(
      table.navigate("/nurse-dashboard", &signed_in(Role::HexaNurse)),
      Navigation::NotFound { path: "/nurse-dashboard".into() }
    );
  }

  #[test]
  fn custom_tables_support_shared_routes() {
    let table = RouteTable::new()
      .public(HOME)
      .protected("/incidents", RoleSet::of(&[Role::Admin, Role::Security]));
    assert!(matches!(
      table.navigate("/incidents", &signed_in(Role::Security)),
      Navigation::Render { .. }
    ));
    assert!(matches!(
      table.navigate("/incidents?page=2", &signed_in(Role::Admin)),
      Navigation::Render { .. }
    ));
  }

  #[test]
  fn landing_path_needs_a_profile() {
    assert_eq!(landing_path(&AuthState::anonymous()), None);
    assert_eq!(landing_path(&signed_in(Role::Security)), Some("/security-dashboard"));
    let mut partial = signed_in(Role::Admin);
    partial.profile = None;
    assert_eq!(landing_path(&partial), None);
  }

  #[test]
  fn normalize_paths() {
    assert_eq!(normalize(""), "/");
    assert_eq!(normalize("/"), "/");
    assert_eq!(normalize("login"), "/login");
    assert_eq!(normalize("/login/#top"), "/login");
  }
}
