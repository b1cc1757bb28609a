//! Dashboard selection.

use serde::{Deserialize, Serialize};

use crate::{role::Role, state::AuthState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardKind {
  Admin,
  Employee,
  #[serde(rename = "hexanurse")]
  HexaNurse,
  Security,
}

impl DashboardKind {
  pub fn for_role(role: Role) -> Self {
    match role {
      Role::Admin => Self::Admin,
      Role::HexaNurse => Self::HexaNurse,
      Role::Security => Self::Security,
      Role::Employee => Self::Employee,
    }
  }

  pub fn path(self) -> &'static str {
    match self {
      Self::Admin => "/admin-dashboard",
      Self::Employee => "/employee-dashboard",
      Self::HexaNurse => "/hexanurse-dashboard",
      Self::Security => "/security-dashboard",
    }
  }

  pub fn title(self) -> &'static str {
    match self {
      Self::Admin => "Admin Dashboard",
      Self::Employee => "Employee Dashboard",
      Self::HexaNurse => "HexaNurse Dashboard",
      Self::Security => "Security Dashboard",
    }
  }
}

/// The dashboard for a role that the route guard has already validated.
pub fn select_dashboard(role: Role) -> DashboardKind { DashboardKind::for_role(role) }

/// What the dashboard slot shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", content = "dashboard", rename_all = "snake_case")]
pub enum DashboardView {
  /// The guard let the request through but the profile has not resolved yet.
  ProfileLoading,
  Mount(DashboardKind),
}

impl DashboardView {
  pub fn for_state(state: &AuthState) -> Self {
    match &state.profile {
      Some(profile) => Self::Mount(select_dashboard(profile.role)),
      None => Self::ProfileLoading,
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use strum::IntoEnumIterator as _;
  use uuid::Uuid;

  use super::*;
  use crate::profile::{NewProfile, ProfileSeed};

  #[test]
  fn every_role_has_its_own_dashboard() {
    let kinds: std::collections::HashSet<_> = Role::iter().map(select_dashboard).collect();
    assert_eq!(kinds.len(), 4);
    assert_eq!(select_dashboard(Role::HexaNurse), DashboardKind::HexaNurse);
    assert_eq!(select_dashboard(Role::Employee).path(), "/employee-dashboard");
  }

  #[test]
  fn dashboard_paths_follow_role_names() {
    for role in Role::iter() {
      assert_eq!(select_dashboard(role).path(), format!("/{role}-dashboard"));
    }
  }

  #[test]
  fn no_profile_means_loading_view() {
    assert_eq!(DashboardView::for_state(&AuthState::anonymous()), DashboardView::ProfileLoading);

    let mut state = AuthState::anonymous();
    state.profile = Some(
      NewProfile::seeded(Uuid::new_v4(), "security@hexaware.com", Role::Security, ProfileSeed::default())
        .into_profile(Utc::now()),
    );
    assert_eq!(
      DashboardView::for_state(&state),
      DashboardView::Mount(DashboardKind::Security)
    );
  }
}
