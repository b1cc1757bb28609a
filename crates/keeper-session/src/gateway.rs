//! [`IdentityGateway`] — bounded, typed access to an [`IdentityBackend`].
//!
//! Every call is wrapped in a timeout. Nothing here panics or retries; the
//! caller always gets a typed result back.

use std::{future::Future, time::Duration};

use keeper_core::{
  AuthError, ProfileError, SignUpError,
  backend::IdentityBackend,
  identity::{AuthEvent, Session, SignUpOutcome},
  profile::{NewProfile, Profile, ProfileSeed, ProfileUpdate},
  role,
};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GatewayConfig {
  /// Upper bound on every backend call.
  #[serde(rename = "timeout_secs", deserialize_with = "secs")]
  pub timeout: Duration,
}

impl Default for GatewayConfig {
  fn default() -> Self { Self { timeout: Duration::from_secs(10) } }
}

fn secs<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
  Ok(Duration::from_secs(u64::deserialize(d)?))
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

pub struct IdentityGateway<B> {
  backend: B,
  config:  GatewayConfig,
}

impl<B: IdentityBackend> IdentityGateway<B> {
  pub fn new(backend: B) -> Self { Self::with_config(backend, GatewayConfig::default()) }

  pub fn with_config(backend: B, config: GatewayConfig) -> Self {
    Self { backend, config }
  }

  pub fn backend(&self) -> &B { &self.backend }

  pub fn config(&self) -> GatewayConfig { self.config }

  async fn bounded<T, E>(
    &self,
    op: &'static str,
    call: impl Future<Output = Result<T, E>>,
    on_timeout: impl FnOnce(String) -> E,
  ) -> Result<T, E> {
    match tokio::time::timeout(self.config.timeout, call).await {
      Ok(result) => result,
      Err(_) => {
        warn!(op, timeout = ?self.config.timeout, "identity backend call timed out");
        Err(on_timeout(format!(
          "{op} timed out after {}s",
          self.config.timeout.as_secs_f32()
        )))
      }
    }
  }

  // ── Identity ──────────────────────────────────────────────────────────

  pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
    let session = self
      .bounded(
        "sign_in",
        self.backend.sign_in_with_password(email, password),
        AuthError::Network,
      )
      .await?;
    info!(user_id = %session.user_id(), "signed in");
    Ok(session)
  }

  /// Create the user, then its profile.
  ///
  /// The role comes from [`role::resolve_role`] and nowhere else. If the
  /// profile write fails the user still exists, without a profile.
  pub async fn sign_up(
    &self,
    email: &str,
    password: &str,
    seed: ProfileSeed,
  ) -> Result<SignUpOutcome, SignUpError> {
    let outcome = self
      .bounded("sign_up", self.backend.sign_up(email, password), AuthError::Network)
      .await?;

    let role = role::resolve_role(email);
    if !role::is_designated(email) {
      info!(user_id = %outcome.user.id, "no designated role for address, defaulting to {role}");
    }

    let profile = NewProfile::seeded(outcome.user.id, email, role, seed);
    self
      .bounded(
        "insert_profile",
        self.backend.insert_profile(profile),
        ProfileError::WriteFailed,
      )
      .await
      .inspect_err(|e| {
        warn!(user_id = %outcome.user.id, error = %e, "user created without a profile");
      })?;

    info!(user_id = %outcome.user.id, %role, "registered");
    Ok(outcome)
  }

  pub async fn sign_out(&self) -> Result<(), AuthError> {
    self
      .bounded("sign_out", self.backend.sign_out(), AuthError::Network)
      .await
  }

  pub async fn get_session(&self) -> Result<Option<Session>, AuthError> {
    self
      .bounded("get_session", self.backend.get_session(), AuthError::Network)
      .await
  }

  pub async fn refresh_session(&self) -> Result<Session, AuthError> {
    self
      .bounded("refresh_session", self.backend.refresh_session(), AuthError::Network)
      .await
  }

  pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> { self.backend.subscribe() }

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Fetch a profile, reporting failures.
  pub async fn try_fetch_profile(
    &self,
    user_id: Uuid,
  ) -> Result<Option<Profile>, ProfileError> {
    self
      .bounded(
        "select_profile",
        self.backend.select_profile(user_id),
        ProfileError::Transport,
      )
      .await
  }

  /// Fetch a profile. Failures are logged and read as "no profile".
  pub async fn fetch_profile(&self, user_id: Uuid) -> Option<Profile> {
    self
      .try_fetch_profile(user_id)
      .await
      .inspect_err(|e| warn!(%user_id, error = %e, "profile fetch failed"))
      .ok()
      .flatten()
  }

  /// Apply `update` and return the stored profile, which is authoritative
  /// over the update itself.
  pub async fn update_profile(
    &self,
    user_id: Uuid,
    update: ProfileUpdate,
  ) -> Result<Profile, ProfileError> {
    self
      .bounded(
        "update_profile",
        self.backend.update_profile(user_id, update),
        ProfileError::WriteFailed,
      )
      .await
  }
}
