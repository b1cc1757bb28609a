//! Demo accounts, one per role, for local development.

use serde_json::json;
use uuid::Uuid;

use crate::{
  profile::{NewProfile, PrivacySettings},
  role::Role,
};

pub const DEMO_PASSWORD: &str = "password123";

#[derive(Debug, Clone, Copy)]
pub struct DemoAccount {
  pub email:           &'static str,
  pub full_name:       &'static str,
  pub employee_id:     &'static str,
  pub role:            Role,
  pub department:      &'static str,
  pub floor_number:    i32,
  pub office_location: &'static str,
}

pub const DEMO_ACCOUNTS: [DemoAccount; 4] = [
  DemoAccount {
    email:           "admin@hexaware.com",
    full_name:       "System Administrator",
    employee_id:     "EMP001",
    role:            Role::Admin,
    department:      "IT",
    floor_number:    1,
    office_location: "A-101",
  },
  DemoAccount {
    email:           "nurse@hexaware.com",
    full_name:       "Sarah Johnson",
    employee_id:     "EMP002",
    role:            Role::HexaNurse,
    department:      "Health",
    floor_number:    2,
    office_location: "B-201",
  },
  DemoAccount {
    email:           "security@hexaware.com",
    full_name:       "Mike Wilson",
    employee_id:     "EMP003",
    role:            Role::Security,
    department:      "Security",
    floor_number:    1,
    office_location: "S-101",
  },
  DemoAccount {
    email:           "employee@hexaware.com",
    full_name:       "John Doe",
    employee_id:     "EMP004",
    role:            Role::Employee,
    department:      "Engineering",
    floor_number:    3,
    office_location: "C-301",
  },
];

impl DemoAccount {
  pub fn profile(&self, user_id: Uuid) -> NewProfile {
    let mut privacy_settings = PrivacySettings::new();
    privacy_settings.insert("share_vitals".into(), json!(true));
    privacy_settings.insert("share_location".into(), json!(true));

    NewProfile {
      user_id,
      email: self.email.to_owned(),
      full_name: self.full_name.to_owned(),
      employee_id: self.employee_id.to_owned(),
      role: self.role,
      department: self.department.to_owned(),
      phone: None,
      emergency_contact: None,
      floor_number: self.floor_number,
      office_location: self.office_location.to_owned(),
      privacy_settings,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::role::resolve_role;

  #[test]
  fn demo_roles_agree_with_the_resolver() {
    for account in DEMO_ACCOUNTS {
      assert_eq!(resolve_role(account.email), account.role, "{}", account.email);
    }
  }

  #[test]
  fn demo_profiles_share_everything() {
    let p = DEMO_ACCOUNTS[1].profile(Uuid::new_v4());
    assert_eq!(p.role, Role::HexaNurse);
    assert_eq!(p.privacy_settings.get("share_vitals"), Some(&json!(true)));
    assert_eq!(p.privacy_settings.get("share_location"), Some(&json!(true)));
  }
}
