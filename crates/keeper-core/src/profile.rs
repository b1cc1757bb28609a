//! Profiles: the application's record of a user's role and organisational
//! attributes.
//!
//! A profile is created exactly once per user, at sign-up. Its role never
//! changes afterwards: [`ProfileUpdate`] deliberately has no role field.
//! Profiles are retired by clearing `is_active`, never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::{self, Role};

/// Free-form privacy preferences, e.g. `{"share_vitals": true}`.
pub type PrivacySettings = serde_json::Map<String, serde_json::Value>;

// ─── Profile ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
  pub user_id:           Uuid,
  pub email:             String,
  pub full_name:         String,
  pub employee_id:       String,
  pub role:              Role,
  pub department:        String,
  pub phone:             Option<String>,
  pub emergency_contact: Option<String>,
  pub floor_number:      i32,
  pub office_location:   String,
  #[serde(default)]
  pub privacy_settings:  PrivacySettings,
  pub is_active:         bool,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

// ─── Sign-up input ───────────────────────────────────────────────────────────

/// What a registering user may supply. Everything is optional; gaps are
/// filled from the role resolver's seed tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSeed {
  pub full_name:         Option<String>,
  pub employee_id:       Option<String>,
  pub department:        Option<String>,
  pub phone:             Option<String>,
  pub emergency_contact: Option<String>,
  pub floor_number:      Option<i32>,
  pub office_location:   Option<String>,
}

/// A profile row ready to insert. Timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProfile {
  pub user_id:           Uuid,
  pub email:             String,
  pub full_name:         String,
  pub employee_id:       String,
  pub role:              Role,
  pub department:        String,
  pub phone:             Option<String>,
  pub emergency_contact: Option<String>,
  pub floor_number:      i32,
  pub office_location:   String,
  #[serde(default)]
  pub privacy_settings:  PrivacySettings,
}

fn non_blank(s: Option<String>) -> Option<String> {
  s.filter(|v| !v.trim().is_empty())
}

impl NewProfile {
  /// Build the insert for a freshly created user whose role has already been
  /// resolved.
  pub fn seeded(user_id: Uuid, email: &str, role: Role, seed: ProfileSeed) -> Self {
    Self {
      user_id,
      email: email.trim().to_owned(),
      full_name: seed.full_name.unwrap_or_default(),
      employee_id: non_blank(seed.employee_id)
        .unwrap_or_else(|| role::employee_id_from_email(email)),
      role,
      department: non_blank(seed.department)
        .unwrap_or_else(|| role::default_department(role).to_owned()),
      phone: non_blank(seed.phone),
      emergency_contact: non_blank(seed.emergency_contact),
      floor_number: seed.floor_number.unwrap_or_else(|| role::default_floor(role)),
      office_location: non_blank(seed.office_location)
        .unwrap_or_else(|| role::default_office_location(role).to_owned()),
      privacy_settings: PrivacySettings::new(),
    }
  }

  /// Materialise the row as the store would, stamping both timestamps with
  /// `now`.
  pub fn into_profile(self, now: DateTime<Utc>) -> Profile {
    Profile {
      user_id:           self.user_id,
      email:             self.email,
      full_name:         self.full_name,
      employee_id:       self.employee_id,
      role:              self.role,
      department:        self.department,
      phone:             self.phone,
      emergency_contact: self.emergency_contact,
      floor_number:      self.floor_number,
      office_location:   self.office_location,
      privacy_settings:  self.privacy_settings,
      is_active:         true,
      created_at:        now,
      updated_at:        now,
    }
  }
}

// ─── Partial update ──────────────────────────────────────────────────────────

/// A partial profile update; `None` leaves the field unchanged.
///
/// For the two nullable fields, `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
  pub full_name:         Option<String>,
  pub employee_id:       Option<String>,
  pub department:        Option<String>,
  #[serde(with = "double_option", skip_serializing_if = "Option::is_none")]
  pub phone:             Option<Option<String>>,
  #[serde(with = "double_option", skip_serializing_if = "Option::is_none")]
  pub emergency_contact: Option<Option<String>>,
  pub floor_number:      Option<i32>,
  pub office_location:   Option<String>,
  pub privacy_settings:  Option<PrivacySettings>,
  pub is_active:         Option<bool>,
}

impl ProfileUpdate {
  pub fn is_empty(&self) -> bool { *self == Self::default() }

  /// Apply the update in place and bump `updated_at` to `now`.
  pub fn apply_to(self, profile: &mut Profile, now: DateTime<Utc>) {
    if let Some(v) = self.full_name {
      profile.full_name = v;
    }
    if let Some(v) = self.employee_id {
      profile.employee_id = v;
    }
    if let Some(v) = self.department {
      profile.department = v;
    }
    if let Some(v) = self.phone {
      profile.phone = v;
    }
    if let Some(v) = self.emergency_contact {
      profile.emergency_contact = v;
    }
    if let Some(v) = self.floor_number {
      profile.floor_number = v;
    }
    if let Some(v) = self.office_location {
      profile.office_location = v;
    }
    if let Some(v) = self.privacy_settings {
      profile.privacy_settings = v;
    }
    if let Some(v) = self.is_active {
      profile.is_active = v;
    }
    profile.updated_at = now;
  }
}

/// Distinguishes an absent key (`None`) from an explicit `null`
/// (`Some(None)`).
mod double_option {
  use serde::{Deserialize, Deserializer, Serialize, Serializer};

  pub fn serialize<S: Serializer>(
    value: &Option<Option<String>>,
    s: S,
  ) -> Result<S::Ok, S::Error> {
    match value {
      Some(inner) => inner.serialize(s),
      None => s.serialize_none(),
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    d: D,
  ) -> Result<Option<Option<String>>, D::Error> {
    Option::<String>::deserialize(d).map(Some)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn seeded_profile_fills_gaps_from_role() {
    let id = Uuid::new_v4();
    let p = NewProfile::seeded(id, "nurse@hexaware.com", Role::HexaNurse, ProfileSeed {
      full_name: Some("Sarah Johnson".into()),
      phone: Some("  ".into()),
      ..Default::default()
    });
    assert_eq!(p.user_id, id);
    assert_eq!(p.role, Role::HexaNurse);
    assert_eq!(p.employee_id, "NURSE");
    assert_eq!(p.department, "Medical");
    assert_eq!(p.office_location, "Medical Wing - Floor 2");
    assert_eq!(p.floor_number, 2);
    assert_eq!(p.phone, None);
  }

  #[test]
  fn seeded_profile_keeps_supplied_values() {
    let p = NewProfile::seeded(
      Uuid::new_v4(),
      "someone@example.com",
      Role::Employee,
      ProfileSeed {
        employee_id: Some("EMP042".into()),
        department: Some("Engineering".into()),
        floor_number: Some(7),
        office_location: Some("C-301".into()),
        ..Default::default()
      },
    );
    assert_eq!(p.employee_id, "EMP042");
    assert_eq!(p.department, "Engineering");
    assert_eq!(p.floor_number, 7);
    assert_eq!(p.office_location, "C-301");
  }

  #[test]
  fn update_touches_only_supplied_fields() {
    let t0 = Utc::now();
    let mut profile = NewProfile::seeded(
      Uuid::new_v4(),
      "employee@hexaware.com",
      Role::Employee,
      ProfileSeed { phone: Some("555-0100".into()), ..Default::default() },
    )
    .into_profile(t0);

    let t1 = t0 + chrono::Duration::seconds(5);
    ProfileUpdate {
      full_name: Some("John Doe".into()),
      phone: Some(None),
      is_active: Some(false),
      ..Default::default()
    }
    .apply_to(&mut profile, t1);

    assert_eq!(profile.full_name, "John Doe");
    assert_eq!(profile.phone, None);
    assert!(!profile.is_active);
    assert_eq!(profile.department, "General");
    assert_eq!(profile.role, Role::Employee);
    assert_eq!(profile.created_at, t0);
    assert_eq!(profile.updated_at, t1);
  }

  #[test]
  fn update_distinguishes_null_from_absent() {
    let cleared: ProfileUpdate =
      serde_json::from_str(r#"{"phone": null}"#).unwrap();
    assert_eq!(cleared.phone, Some(None));

    let untouched: ProfileUpdate = serde_json::from_str("{}").unwrap();
    assert_eq!(untouched.phone, None);
    assert!(untouched.is_empty());

    let json = serde_json::to_value(&cleared).unwrap();
    assert!(json.get("phone").unwrap().is_null());
    assert!(json.get("emergency_contact").is_none());
  }

  #[test]
  fn role_is_not_updatable() {
    let update = serde_json::from_str::<ProfileUpdate>(r#"{"role": "admin"}"#);
    // Unknown keys are ignored rather than applied.
    assert!(update.unwrap().is_empty());
  }
}
