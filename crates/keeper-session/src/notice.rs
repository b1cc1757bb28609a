//! Transient user-facing notifications ("toasts").

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
  Info,
  Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub level:       NoticeLevel,
  pub title:       &'static str,
  pub description: String,
}

impl Notice {
  pub fn info(title: &'static str, description: impl Into<String>) -> Self {
    Self { level: NoticeLevel::Info, title, description: description.into() }
  }

  pub fn destructive(title: &'static str, description: impl fmt::Display) -> Self {
    Self {
      level: NoticeLevel::Destructive,
      title,
      description: description.to_string(),
    }
  }
}

impl fmt::Display for Notice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.title, self.description)
  }
}

pub const LOGIN_FAILED: &str = "Login Failed";
pub const REGISTRATION_FAILED: &str = "Registration Failed";
pub const UPDATE_FAILED: &str = "Update Failed";
pub const PROFILE_UPDATED: &str = "Profile Updated";
pub const PROFILE_UNAVAILABLE: &str = "Profile Unavailable";
