//! [`LocalBackend`] — an in-process [`IdentityBackend`] over [`SqliteStore`].
//!
//! Plays the part of a client library talking to the identity service: it
//! remembers the one current session and announces every change to it.

use std::{
  future::Future,
  sync::{Mutex, MutexGuard, PoisonError},
};

use keeper_core::{
  AuthError, ProfileError,
  backend::IdentityBackend,
  identity::{AuthEvent, Session, SignUpOutcome},
  profile::{NewProfile, Profile, ProfileUpdate},
};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::SqliteStore;

const EVENT_CAPACITY: usize = 16;

pub struct LocalBackend {
  store:   SqliteStore,
  current: Mutex<Option<Session>>,
  events:  broadcast::Sender<AuthEvent>,
}

impl LocalBackend {
  pub fn new(store: SqliteStore) -> Self {
    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    Self { store, current: Mutex::new(None), events }
  }

  pub fn store(&self) -> &SqliteStore { &self.store }

  fn current(&self) -> MutexGuard<'_, Option<Session>> {
    self.current.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn announce(&self, event: AuthEvent) {
    debug!(?event, "auth event");
    // No subscribers is fine.
    let _ = self.events.send(event);
  }

  fn adopt(&self, session: Session, event: fn(Session) -> AuthEvent) {
    *self.current() = Some(session.clone());
    self.announce(event(session));
  }

  fn expire(&self) {
    if self.current().take().is_some() {
      self.announce(AuthEvent::Expired);
    }
  }
}

impl IdentityBackend for LocalBackend {
  fn sign_in_with_password<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Session, AuthError>> + Send + 'a {
    async move {
      let session = self.store.authenticate(email, password).await?;
      self.adopt(session.clone(), AuthEvent::SignedIn);
      Ok(session)
    }
  }

  /// Registration signs the new user straight in.
  fn sign_up<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<SignUpOutcome, AuthError>> + Send + 'a {
    async move {
      let user = self.store.register(email, password).await?;
      let session = self.store.open_session(user.clone()).await?;
      self.adopt(session.clone(), AuthEvent::SignedIn);
      Ok(SignUpOutcome { user, session: Some(session) })
    }
  }

  fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send + '_ {
    async move {
      let Some(session) = self.current().take() else {
        return Ok(());
      };
      self.announce(AuthEvent::SignedOut);
      self.store.revoke(&session.access_token).await?;
      Ok(())
    }
  }

  fn get_session(
    &self,
  ) -> impl Future<Output = Result<Option<Session>, AuthError>> + Send + '_ {
    async move {
      let Some(session) = self.current().clone() else {
        return Ok(None);
      };
      if session.is_expired() || self.store.validate(&session.access_token).await?.is_none() {
        debug!(user_id = %session.user_id(), "current session is no longer valid");
        self.expire();
        return Ok(None);
      }
      Ok(Some(session))
    }
  }

  fn refresh_session(&self) -> impl Future<Output = Result<Session, AuthError>> + Send + '_ {
    async move {
      let Some(refresh_token) = self.current().as_ref().map(|s| s.refresh_token.clone())
      else {
        return Err(AuthError::Unknown("no session to refresh".into()));
      };
      match self.store.refresh(&refresh_token).await {
        Ok(session) => {
          self.adopt(session.clone(), AuthEvent::TokenRefreshed);
          Ok(session)
        }
        Err(e) => {
          warn!(error = %e, "session refresh rejected");
          self.expire();
          Err(e.into())
        }
      }
    }
  }

  fn subscribe(&self) -> broadcast::Receiver<AuthEvent> { self.events.subscribe() }

  fn select_profile(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, ProfileError>> + Send + '_ {
    async move {
      self
        .store
        .get_profile(user_id)
        .await
        .map_err(|e| ProfileError::Transport(e.to_string()))
    }
  }

  fn insert_profile(
    &self,
    profile: NewProfile,
  ) -> impl Future<Output = Result<Profile, ProfileError>> + Send + '_ {
    async move { Ok(self.store.insert_profile(profile).await?) }
  }

  fn update_profile(
    &self,
    user_id: Uuid,
    update: ProfileUpdate,
  ) -> impl Future<Output = Result<Profile, ProfileError>> + Send + '_ {
    async move { Ok(self.store.update_profile(user_id, update).await?) }
  }
}
