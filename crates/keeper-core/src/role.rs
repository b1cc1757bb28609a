//! Roles and the role resolver.
//!
//! The resolver is pure and runs only at account creation. A profile's role is
//! never re-derived from its email afterwards; changing the designated
//! addresses below must not move existing accounts between roles.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator as _, IntoStaticStr};

// ─── Role ────────────────────────────────────────────────────────────────────

/// The closed set of account roles.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
  /// Organisation-wide oversight.
  Admin,
  /// Personal dashboard only.
  Employee,
  /// Medical monitoring and triage.
  #[serde(rename = "hexanurse")]
  #[strum(serialize = "hexanurse")]
  HexaNurse,
  /// Incident response.
  Security,
}

impl Role {
  pub fn as_str(self) -> &'static str { self.into() }

  /// Parse a stored or user-supplied role name, ignoring ASCII case.
  pub fn parse(s: &str) -> crate::Result<Self> {
    s.trim()
      .parse()
      .map_err(|_| crate::Error::UnknownRole(s.to_owned()))
  }

  const fn bit(self) -> u8 { 1 << (self as u8) }
}

// ─── RoleSet ─────────────────────────────────────────────────────────────────

/// A set of roles, e.g. the roles allowed onto a protected route.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RoleSet(u8);

impl RoleSet {
  pub const EMPTY: Self = Self(0);

  pub const fn of(roles: &[Role]) -> Self {
    let mut bits = 0;
    let mut i = 0;
    while i < roles.len() {
      bits |= roles[i].bit();
      i += 1;
    }
    Self(bits)
  }

  pub const fn only(role: Role) -> Self { Self(role.bit()) }

  pub const fn contains(self, role: Role) -> bool { self.0 & role.bit() != 0 }

  pub const fn with(self, role: Role) -> Self { Self(self.0 | role.bit()) }

  pub const fn is_empty(self) -> bool { self.0 == 0 }

  pub fn iter(self) -> impl Iterator<Item = Role> {
    Role::iter().filter(move |r| self.contains(*r))
  }
}

impl FromIterator<Role> for RoleSet {
  fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
    iter.into_iter().fold(Self::EMPTY, Self::with)
  }
}

impl fmt::Debug for RoleSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set().entries(self.iter()).finish()
  }
}

impl Serialize for RoleSet {
  fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(self.iter())
  }
}

impl<'de> Deserialize<'de> for RoleSet {
  fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
    Ok(Vec::<Role>::deserialize(d)?.into_iter().collect())
  }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Addresses that designate a role. Matched exactly, ignoring ASCII case.
const DESIGNATED: [(&str, Role); 4] = [
  ("admin@hexaware.com", Role::Admin),
  ("nurse@hexaware.com", Role::HexaNurse),
  ("security@hexaware.com", Role::Security),
  ("employee@hexaware.com", Role::Employee),
];

fn designated_role(email: &str) -> Option<Role> {
  let email = email.trim();
  DESIGNATED
    .iter()
    .find(|(address, _)| address.eq_ignore_ascii_case(email))
    .map(|(_, role)| *role)
}

/// Resolve the role for a new account. Anything not designated is an
/// [`Role::Employee`].
pub fn resolve_role(email: &str) -> Role {
  designated_role(email).unwrap_or(Role::Employee)
}

/// Whether `email` is one of the role-designated addresses, as opposed to
/// falling through to the employee default.
pub fn is_designated(email: &str) -> bool { designated_role(email).is_some() }

/// Default employee id: the local part of the address, upper-cased.
pub fn employee_id_from_email(email: &str) -> String {
  let local = email.trim().split('@').next().unwrap_or_default();
  local.to_uppercase()
}

pub fn default_department(role: Role) -> &'static str {
  match role {
    Role::Admin => "Administration",
    Role::HexaNurse => "Medical",
    Role::Security => "Security",
    Role::Employee => "General",
  }
}

pub fn default_office_location(role: Role) -> &'static str {
  match role {
    Role::Admin => "Admin Office - Floor 5",
    Role::HexaNurse => "Medical Wing - Floor 2",
    Role::Security => "Security Station - Ground Floor",
    Role::Employee => "General Office - Floor 3",
  }
}

/// Floor of [`default_office_location`]; the ground floor is 0.
pub fn default_floor(role: Role) -> i32 {
  match role {
    Role::Admin => 5,
    Role::HexaNurse => 2,
    Role::Security => 0,
    Role::Employee => 3,
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use strum::IntoEnumIterator as _;

  use super::*;

  #[test]
  fn designated_addresses_resolve_to_their_role() {
    assert_eq!(resolve_role("admin@hexaware.com"), Role::Admin);
    assert_eq!(resolve_role("nurse@hexaware.com"), Role::HexaNurse);
    assert_eq!(resolve_role("security@hexaware.com"), Role::Security);
    assert_eq!(resolve_role("employee@hexaware.com"), Role::Employee);
  }

  #[test]
  fn matching_ignores_case() {
    assert_eq!(resolve_role("ADMIN@Hexaware.COM"), Role::Admin);
    assert_eq!(resolve_role("  Nurse@hexaware.com "), Role::HexaNurse);
  }

  #[test]
  fn everything_else_is_an_employee() {
    for email in [
      "admin@hexaware.co",
      "admin@admin.hexaware.com",
      "someone@example.com",
      "security",
      "",
    ] {
      assert_eq!(resolve_role(email), Role::Employee, "{email:?}");
      assert!(!is_designated(email));
    }
    assert!(is_designated("employee@hexaware.com"));
  }

  #[test]
  fn employee_id_is_upper_cased_local_part() {
    assert_eq!(employee_id_from_email("jane.doe@hexaware.com"), "JANE.DOE");
    assert_eq!(employee_id_from_email("no-at-sign"), "NO-AT-SIGN");
  }

  #[test]
  fn seed_tables_cover_every_role() {
    assert_eq!(default_department(Role::Security), "Security");
    assert_eq!(default_office_location(Role::HexaNurse), "Medical Wing - Floor 2");
    for role in Role::iter() {
      let location = default_office_location(role);
      let floor = default_floor(role);
      if floor == 0 {
        assert!(location.ends_with("Ground Floor"));
      } else {
        assert!(location.ends_with(&format!("Floor {floor}")), "{location}");
      }
    }
  }

  #[test]
  fn role_names_round_trip() {
    for role in Role::iter() {
      assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
      let json = serde_json::to_string(&role).unwrap();
      assert_eq!(json, format!("\"{role}\""));
    }
    assert_eq!(Role::from_str("HexaNurse").unwrap(), Role::HexaNurse);
    assert!(Role::from_str("nurse").is_err());
    assert!(matches!(Role::parse(" Security "), Ok(Role::Security)));
    assert!(matches!(Role::parse("root"), Err(crate::Error::UnknownRole(_))));
  }

  #[test]
  fn role_set_membership() {
    let set = RoleSet::of(&[Role::Admin, Role::Security]);
    assert!(set.contains(Role::Admin));
    assert!(set.contains(Role::Security));
    assert!(!set.contains(Role::Employee));
    assert_eq!(set.iter().collect::<Vec<_>>(), vec![Role::Admin, Role::Security]);
    assert!(RoleSet::EMPTY.is_empty());
    assert_eq!(RoleSet::only(Role::HexaNurse), [Role::HexaNurse].into_iter().collect());
  }
}
