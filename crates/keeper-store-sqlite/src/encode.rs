//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings,
//! roles their lowercase names, and privacy settings compact JSON.

use chrono::{DateTime, Utc};
use keeper_core::{
  Role,
  identity::User,
  profile::{PrivacySettings, Profile},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_role(role: Role) -> &'static str { role.as_str() }

pub fn encode_privacy(settings: &PrivacySettings) -> Result<String> {
  Ok(serde_json::to_string(settings)?)
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// A `users` row as read from SQLite, minus the password hash.
pub struct RawUser {
  pub user_id:        String,
  pub email:          String,
  pub email_verified: bool,
}

impl RawUser {
  pub const COLUMNS: &'static str = "user_id, email, email_verified";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:        row.get(0)?,
      email:          row.get(1)?,
      email_verified: row.get(2)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:             decode_uuid(&self.user_id)?,
      email:          self.email,
      email_verified: self.email_verified,
    })
  }
}

/// A `sessions` row joined with its user.
pub struct RawSession {
  pub session_id: String,
  pub expires_at: String,
  pub user:       RawUser,
}

impl RawSession {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id: row.get(0)?,
      expires_at: row.get(1)?,
      user:       RawUser {
        user_id:        row.get(2)?,
        email:          row.get(3)?,
        email_verified: row.get(4)?,
      },
    })
  }
}

pub struct RawProfile {
  pub user_id:           String,
  pub email:             String,
  pub full_name:         String,
  pub employee_id:       String,
  pub role:              String,
  pub department:        String,
  pub phone:             Option<String>,
  pub emergency_contact: Option<String>,
  pub floor_number:      i32,
  pub office_location:   String,
  pub privacy_settings:  String,
  pub is_active:         bool,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawProfile {
  pub const COLUMNS: &'static str = "user_id, email, full_name, employee_id, role, department, \
                                     phone, emergency_contact, floor_number, office_location, \
                                     privacy_settings, is_active, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:           row.get(0)?,
      email:             row.get(1)?,
      full_name:         row.get(2)?,
      employee_id:       row.get(3)?,
      role:              row.get(4)?,
      department:        row.get(5)?,
      phone:             row.get(6)?,
      emergency_contact: row.get(7)?,
      floor_number:      row.get(8)?,
      office_location:   row.get(9)?,
      privacy_settings:  row.get(10)?,
      is_active:         row.get(11)?,
      created_at:        row.get(12)?,
      updated_at:        row.get(13)?,
    })
  }

  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      user_id:           decode_uuid(&self.user_id)?,
      email:             self.email,
      full_name:         self.full_name,
      employee_id:       self.employee_id,
      role:              Role::parse(&self.role)?,
      department:        self.department,
      phone:             self.phone,
      emergency_contact: self.emergency_contact,
      floor_number:      self.floor_number,
      office_location:   self.office_location,
      privacy_settings:  serde_json::from_str(&self.privacy_settings)?,
      is_active:         self.is_active,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn datetime_survives_storage() {
    let now = Utc::now();
    assert_eq!(decode_dt(&encode_dt(now)).unwrap(), now);
  }

  #[test]
  fn malformed_datetime_is_an_error() {
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }

  #[test]
  fn unknown_role_in_row_is_rejected() {
    let raw = RawProfile {
      user_id:           encode_uuid(Uuid::new_v4()),
      email:             "x@hexaware.com".into(),
      full_name:         String::new(),
      employee_id:       "X".into(),
      role:              "janitor".into(),
      department:        "General".into(),
      phone:             None,
      emergency_contact: None,
      floor_number:      1,
      office_location:   "A".into(),
      privacy_settings:  "{}".into(),
      is_active:         true,
      created_at:        encode_dt(Utc::now()),
      updated_at:        encode_dt(Utc::now()),
    };
    assert!(matches!(raw.into_profile(), Err(Error::Core(_))));
  }
}
