//! The `IdentityBackend` trait.
//!
//! The trait is implemented by concrete identity/storage services
//! (`keeper-store-sqlite` in-process, `keeper-client` over HTTP). Higher
//! layers (`keeper-session`) depend on this abstraction, not on any concrete
//! backend.
//!
//! A backend is client-shaped: it remembers the current session of the one
//! client using it and pushes an [`AuthEvent`] whenever that session changes.

use std::future::Future;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
  error::{AuthError, ProfileError},
  identity::{AuthEvent, Session, SignUpOutcome},
  profile::{NewProfile, Profile, ProfileUpdate},
};

/// Abstraction over an external identity + profile storage service.
///
/// All methods return `Send` futures so the trait can be driven from spawned
/// tokio tasks.
pub trait IdentityBackend: Send + Sync + 'static {
  // ── Identity ──────────────────────────────────────────────────────────

  /// Authenticate with email and password. On success the backend also
  /// pushes [`AuthEvent::SignedIn`].
  fn sign_in_with_password<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Session, AuthError>> + Send + 'a;

  /// Create the identity record. Does not create a profile.
  fn sign_up<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<SignUpOutcome, AuthError>> + Send + 'a;

  /// Invalidate the current session remotely and forget it locally. Signing
  /// out with no session is not an error.
  fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send + '_;

  /// The current session, if one is live. An expired session is reported as
  /// `None` and announced with [`AuthEvent::Expired`].
  fn get_session(
    &self,
  ) -> impl Future<Output = Result<Option<Session>, AuthError>> + Send + '_;

  /// Exchange the refresh token for a new session and push
  /// [`AuthEvent::TokenRefreshed`].
  fn refresh_session(
    &self,
  ) -> impl Future<Output = Result<Session, AuthError>> + Send + '_;

  /// Subscribe to session changes.
  fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// The profile row for `user_id`, or `None` if there is none.
  fn select_profile(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, ProfileError>> + Send + '_;

  /// Insert a profile. Fails with [`ProfileError::Conflict`] if the user
  /// already has one.
  fn insert_profile(
    &self,
    profile: NewProfile,
  ) -> impl Future<Output = Result<Profile, ProfileError>> + Send + '_;

  /// Apply a partial update and return the stored result.
  fn update_profile(
    &self,
    user_id: Uuid,
    update: ProfileUpdate,
  ) -> impl Future<Output = Result<Profile, ProfileError>> + Send + '_;
}
