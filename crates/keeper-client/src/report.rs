//! Plain-text rendering of profiles, navigation outcomes and the route table.

use std::fmt::Write as _;

use keeper_core::{
  dashboard::DashboardView,
  guard::Decision,
  profile::Profile,
  routes::{Access, Navigation, Route},
};

pub fn profile(p: &Profile) -> String {
  let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".into());
  let mut out = String::new();
  let rows = [
    ("Name", p.full_name.clone()),
    ("Email", p.email.clone()),
    ("Employee ID", p.employee_id.clone()),
    ("Role", p.role.to_string()),
    ("Department", p.department.clone()),
    ("Floor", p.floor_number.to_string()),
    ("Office", p.office_location.clone()),
    ("Phone", or_dash(&p.phone)),
    ("Emergency", or_dash(&p.emergency_contact)),
    ("Active", if p.is_active { "yes" } else { "no" }.into()),
    ("Updated", p.updated_at.format("%Y-%m-%d %H:%M UTC").to_string()),
  ];
  for (label, value) in rows {
    let _ = writeln!(out, "{:<12} {value}", format!("{label}:"));
  }
  out
}

pub fn navigation(nav: &Navigation) -> String {
  match nav {
    Navigation::Render { path } => format!("render {path}"),
    Navigation::RenderLoading { path } => format!("loading {path}"),
    Navigation::Redirect { to, decision } => {
      let why = match decision {
        Decision::RedirectToLogin => "sign-in required",
        Decision::RedirectToUnauthorized => "not permitted",
        Decision::Render | Decision::RenderLoading => "redirect",
      };
      format!("redirect to {to} ({why})")
    }
    Navigation::NotFound { path } => format!("no route for {path}"),
  }
}

pub fn dashboard(view: DashboardView) -> String {
  match view {
    DashboardView::Mount(kind) => format!("{} ({})", kind.title(), kind.path()),
    DashboardView::ProfileLoading => "loading profile".into(),
  }
}

pub fn routes(routes: &[Route]) -> String {
  let width = routes.iter().map(|r| r.path.len()).max().unwrap_or(0);
  let mut out = String::new();
  for route in routes {
    let access = match route.access {
      Access::Public => "public".to_owned(),
      Access::Protected(roles) => roles.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(", "),
    };
    let _ = writeln!(out, "{:<width$}  {access}", route.path);
  }
  out
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use keeper_core::{
    dashboard::DashboardKind,
    profile::{NewProfile, ProfileSeed},
    role::Role,
    routes::RouteTable,
  };
  use uuid::Uuid;

  use super::*;

  #[test]
  fn profile_lists_every_field() {
    let p = NewProfile::seeded(
      Uuid::new_v4(),
      "nurse@hexaware.com",
      Role::HexaNurse,
      ProfileSeed { full_name: Some("Sarah Johnson".into()), ..ProfileSeed::default() },
    )
    .into_profile(Utc::now());

    let text = profile(&p);
    assert!(text.contains("Name:        Sarah Johnson"));
    assert!(text.contains("Role:        hexanurse"));
    assert!(text.contains("Phone:       -"));
  }

  #[test]
  fn redirect_explains_itself() {
    let nav = Navigation::Redirect {
      to:       "/unauthorized",
      decision: Decision::RedirectToUnauthorized,
    };
    assert_eq!(navigation(&nav), "redirect to /unauthorized (not permitted)");
  }

  #[test]
  fn dashboard_names_the_mount() {
    assert_eq!(
      dashboard(DashboardView::Mount(DashboardKind::Security)),
      "Security Dashboard (/security-dashboard)"
    );
  }

  #[test]
  fn routes_are_aligned() {
    let text = routes(RouteTable::standard().routes());
    assert!(text.lines().any(|l| l.starts_with("/login") && l.ends_with("public")));
    assert!(text.lines().any(|l| l.starts_with("/admin-dashboard") && l.ends_with("admin")));
    assert_eq!(text.lines().count(), 7);
  }
}
