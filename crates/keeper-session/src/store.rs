//! [`SessionStore`] — the single source of truth for who is signed in.
//!
//! State lives in a [`watch`] channel so any number of observers can follow
//! it. It is written from three places that may interleave:
//!
//! - the startup probe, run once by [`SessionStore::start`];
//! - a background task consuming the backend's [`AuthEvent`] stream;
//! - the user-initiated operations on [`SessionStore`] itself.
//!
//! Every write goes through one commit path, so each one is atomic and the
//! last writer wins. Profile fetches run as spawned tasks keyed by user id; a
//! result is committed only if that user is still the current one. Every
//! session change bumps an epoch, so work started against an older session
//! (the startup probe) can tell that it has been overtaken.

use std::sync::{
  Arc, Mutex, MutexGuard, PoisonError, Weak,
  atomic::{AtomicU64, AtomicUsize, Ordering},
};

use keeper_core::{
  AuthError, ProfileError, SignUpError,
  backend::IdentityBackend,
  identity::{AuthEvent, Session, User},
  profile::{Profile, ProfileSeed, ProfileUpdate},
  guard::{self, Decision},
  role::RoleSet,
  routes::{Navigation, RouteTable},
  state::{AuthPhase, AuthState},
};
use tokio::{
  sync::{broadcast, watch},
  task::JoinHandle,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
  gateway::IdentityGateway,
  notice::{self, Notice},
};

const NOTICE_CAPACITY: usize = 32;

// ─── Store ───────────────────────────────────────────────────────────────────

/// Cheap to clone; all clones share one state.
pub struct SessionStore<B: IdentityBackend> {
  inner: Arc<Inner<B>>,
}

impl<B: IdentityBackend> Clone for SessionStore<B> {
  fn clone(&self) -> Self { Self { inner: Arc::clone(&self.inner) } }
}

pub(crate) struct Inner<B: IdentityBackend> {
  gateway:     IdentityGateway<B>,
  state:       watch::Sender<AuthState>,
  notices:     broadcast::Sender<Notice>,
  fetch:       Mutex<Option<ProfileFetch>>,
  listener:    Mutex<Option<JoinHandle<()>>>,
  /// Bumped before every session adoption or clear.
  epoch:       AtomicU64,
  /// Sign-ups in flight. Their profile row may not exist yet.
  registering: AtomicUsize,
}

struct ProfileFetch {
  user_id: Uuid,
  task:    JoinHandle<()>,
}

impl<B: IdentityBackend> SessionStore<B> {
  /// Build a store in the Initializing state without probing or listening.
  pub(crate) fn new(gateway: IdentityGateway<B>) -> Self {
    let (state, _) = watch::channel(AuthState::initializing());
    let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
    Self {
      inner: Arc::new(Inner {
        gateway,
        state,
        notices,
        fetch: Mutex::new(None),
        listener: Mutex::new(None),
        epoch: AtomicU64::new(0),
        registering: AtomicUsize::new(0),
      }),
    }
  }

  /// Create the store, subscribe to session changes, and run the startup
  /// probe. Returns once the probe has finished (`loading == false`).
  pub async fn start(gateway: IdentityGateway<B>) -> Self {
    let store = Self::new(gateway);
    let events = store.inner.gateway.subscribe();
    let listener = tokio::spawn(listen(Arc::downgrade(&store.inner), events));
    *lock(&store.inner.listener) = Some(listener);
    store.inner.probe().await;
    store
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub fn snapshot(&self) -> AuthState { self.inner.state.borrow().clone() }

  pub fn phase(&self) -> AuthPhase { self.inner.state.borrow().phase() }

  pub fn session(&self) -> Option<Session> { self.inner.state.borrow().session.clone() }

  pub fn user(&self) -> Option<User> { self.inner.state.borrow().user.clone() }

  pub fn profile(&self) -> Option<Profile> { self.inner.state.borrow().profile.clone() }

  pub fn loading(&self) -> bool { self.inner.state.borrow().loading }

  /// Follow state changes.
  pub fn subscribe(&self) -> watch::Receiver<AuthState> { self.inner.state.subscribe() }

  /// Follow user-facing notifications.
  pub fn notices(&self) -> broadcast::Receiver<Notice> { self.inner.notices.subscribe() }

  pub fn gateway(&self) -> &IdentityGateway<B> { &self.inner.gateway }

  /// Guard a view restricted to `allowed` against the current state.
  pub fn authorize(&self, allowed: RoleSet) -> Decision {
    guard::authorize(&self.inner.state.borrow(), allowed)
  }

  /// Resolve a navigation to `path` against the current state.
  pub fn navigate(&self, routes: &RouteTable, path: &str) -> Navigation {
    routes.navigate(path, &self.inner.state.borrow())
  }

  /// Wait until the probe has finished and no profile fetch is pending.
  pub async fn settled(&self) -> AuthState {
    let mut rx = self.subscribe();
    match rx.wait_for(|s| !s.loading && !s.profile_pending).await {
      Ok(state) => state.clone(),
      Err(_) => self.snapshot(),
    }
  }

  // ── Operations ────────────────────────────────────────────────────────

  /// Sign in. On success the session is in the store before this returns;
  /// the profile follows asynchronously.
  pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
    match self.inner.gateway.sign_in(email, password).await {
      Ok(session) => {
        self.inner.adopt_session(session);
        Ok(())
      }
      Err(e) => {
        self.inner.notify(Notice::destructive(notice::LOGIN_FAILED, &e));
        Err(e)
      }
    }
  }

  /// Register a new account. If the backend signs the new user straight in,
  /// the store is authenticated before this returns.
  pub async fn sign_up(
    &self,
    email: &str,
    password: &str,
    seed: ProfileSeed,
  ) -> Result<(), SignUpError> {
    let outcome = {
      let _registering = Registering::enter(&self.inner.registering);
      self.inner.gateway.sign_up(email, password, seed).await
    };

    let result = match outcome {
      Ok(outcome) => {
        if let Some(session) = outcome.session {
          self.inner.adopt_session(session);
        }
        Ok(())
      }
      Err(e) => {
        if let SignUpError::Profile(_) = e
          && let Some(session) = self.inner.gateway.get_session().await.ok().flatten()
        {
          self.inner.adopt_session(session);
        }
        self.inner.notify(Notice::destructive(notice::REGISTRATION_FAILED, &e));
        Err(e)
      }
    };

    // Fetches started by the sign-in event kept quiet about a missing row;
    // this one reports.
    let pending = {
      let state = self.inner.state.borrow();
      state.profile.is_none().then(|| state.user_id()).flatten()
    };
    if let Some(user_id) = pending {
      self.inner.schedule_profile_fetch(user_id, true);
    }
    result
  }

  /// Sign out. Local state is always cleared, whatever the backend says;
  /// remote failures are logged and swallowed. Signing out while already
  /// signed out does nothing.
  pub async fn sign_out(&self) {
    if self.inner.state.borrow().session.is_none() {
      debug!("sign-out requested with no session");
      return;
    }
    if let Err(e) = self.inner.gateway.sign_out().await {
      warn!(error = %e, "remote sign-out failed; clearing local session anyway");
    }
    self.inner.clear_local();
    info!("signed out");
  }

  /// Update the current user's profile and adopt the stored result.
  pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Profile, ProfileError> {
    let Some(user_id) = self.inner.state.borrow().user_id() else {
      let e = ProfileError::WriteFailed("no user is signed in".into());
      self.inner.notify(Notice::destructive(notice::UPDATE_FAILED, &e));
      return Err(e);
    };

    match self.inner.gateway.update_profile(user_id, update).await {
      Ok(profile) => {
        self.inner.commit_profile(user_id, Ok(Some(profile.clone())));
        self.inner.notify(Notice::info(
          notice::PROFILE_UPDATED,
          "Your profile has been successfully updated.",
        ));
        Ok(profile)
      }
      Err(e) => {
        self.inner.notify(Notice::destructive(notice::UPDATE_FAILED, &e));
        Err(e)
      }
    }
  }

  /// Fetch the current user's profile again and wait for the result.
  pub async fn refresh_profile(&self) -> Option<Profile> {
    let user_id = self.inner.state.borrow().user_id()?;
    self.inner.commit(|s| s.profile_pending = true);
    let result = self.inner.gateway.try_fetch_profile(user_id).await;
    self.inner.commit_profile(user_id, result);
    self.profile()
  }

  /// Exchange the refresh token for a new session.
  pub async fn refresh_session(&self) -> Result<(), AuthError> {
    let session = self.inner.gateway.refresh_session().await?;
    self.inner.adopt_session(session);
    Ok(())
  }
}

// ─── Event listener ──────────────────────────────────────────────────────────

/// Apply backend events until the store or the backend goes away.
async fn listen<B: IdentityBackend>(
  inner: Weak<Inner<B>>,
  mut events: broadcast::Receiver<AuthEvent>,
) {
  loop {
    let event = match events.recv().await {
      Ok(event) => event,
      Err(broadcast::error::RecvError::Lagged(skipped)) => {
        warn!(skipped, "auth event listener lagged; resynchronising");
        let Some(inner) = inner.upgrade() else { return };
        match inner.gateway.get_session().await {
          Ok(Some(session)) => AuthEvent::SignedIn(session),
          Ok(None) => AuthEvent::SignedOut,
          Err(e) => {
            warn!(error = %e, "could not resynchronise session");
            continue;
          }
        }
      }
      Err(broadcast::error::RecvError::Closed) => return,
    };
    let Some(inner) = inner.upgrade() else { return };
    inner.apply(event);
  }
}

// ─── Internals ───────────────────────────────────────────────────────────────

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
  m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counts one sign-up in flight for as long as it lives.
struct Registering<'a>(&'a AtomicUsize);

impl<'a> Registering<'a> {
  fn enter(count: &'a AtomicUsize) -> Self {
    count.fetch_add(1, Ordering::SeqCst);
    Self(count)
  }
}

impl Drop for Registering<'_> {
  fn drop(&mut self) { self.0.fetch_sub(1, Ordering::SeqCst); }
}

impl<B: IdentityBackend> Inner<B> {
  /// Write to the state, checking the phase transition it causes.
  pub(crate) fn commit(&self, f: impl FnOnce(&mut AuthState)) {
    self.state.send_if_modified(|state| {
      let before = state.clone();
      f(state);
      let (from, to) = (before.phase(), state.phase());
      if from != to {
        if from.can_transition_to(to) {
          debug!(?from, ?to, "auth phase transition");
        } else {
          error!(?from, ?to, "illegal auth phase transition");
        }
      }
      *state != before
    });
  }

  fn notify(&self, notice: Notice) {
    debug!(%notice, "notice");
    // Nobody listening is fine.
    let _ = self.notices.send(notice);
  }

  fn apply(self: &Arc<Self>, event: AuthEvent) {
    debug!(?event, "auth event");
    match event {
      AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session) => {
        self.adopt_session(session);
      }
      AuthEvent::SignedOut | AuthEvent::Expired => self.clear_local(),
    }
  }

  async fn probe(self: &Arc<Self>) {
    let epoch = self.epoch.load(Ordering::SeqCst);
    let session = self.gateway.get_session().await.unwrap_or_else(|e| {
      warn!(error = %e, "session probe failed; starting signed out");
      None
    });

    let Some(session) = session else {
      self.commit(|s| s.loading = false);
      return;
    };

    let user_id = session.user_id();
    info!(%user_id, "restored session");
    let profile = self.gateway.fetch_profile(user_id).await;
    self.commit(|s| {
      // An event signed someone in or out while the profile was loading.
      if self.epoch.load(Ordering::SeqCst) != epoch {
        debug!(%user_id, "restored session overtaken; keeping current state");
        s.loading = false;
        return;
      }
      let mut restored = AuthState::authenticated(session);
      restored.profile = profile.or_else(|| s.profile.take());
      *s = restored;
    });
  }

  /// Make `session` current. A session for a different user first drops the
  /// old one entirely.
  fn adopt_session(self: &Arc<Self>, session: Session) {
    let user_id = session.user_id();
    let current = self.state.borrow().user_id();
    if current.is_some_and(|id| id != user_id) {
      debug!(from = ?current, to = %user_id, "session switched user");
      self.clear_local();
    }

    let mut fetch = false;
    self.epoch.fetch_add(1, Ordering::SeqCst);
    self.commit(|s| {
      s.loading = false;
      s.user = Some(session.user.clone());
      s.session = Some(session);
      if s.profile.is_none() && !s.profile_pending {
        fetch = true;
      }
    });
    if fetch {
      self.schedule_profile_fetch(user_id, false);
    }
  }

  /// Drop the session locally and cancel any profile fetch.
  fn clear_local(&self) {
    if let Some(fetch) = lock(&self.fetch).take() {
      debug!(user_id = %fetch.user_id, "cancelling profile fetch");
      fetch.task.abort();
    }
    self.epoch.fetch_add(1, Ordering::SeqCst);
    self.commit(|s| {
      let loading = s.loading;
      *s = AuthState { loading, ..AuthState::anonymous() };
    });
  }

  /// Start fetching `user_id`'s profile in the background. Unless `force` is
  /// set, an unfinished fetch for the same user is left to complete.
  pub(crate) fn schedule_profile_fetch(self: &Arc<Self>, user_id: Uuid, force: bool) {
    let mut slot = lock(&self.fetch);
    if let Some(existing) = slot.as_ref()
      && existing.user_id == user_id
      && !existing.task.is_finished()
      && !force
    {
      return;
    }
    if let Some(previous) = slot.take() {
      previous.task.abort();
    }

    self.commit(|s| {
      if s.user_id() == Some(user_id) {
        s.profile_pending = true;
      }
    });

    let quiet = self.registering.load(Ordering::SeqCst) > 0;
    debug!(%user_id, force, quiet, "scheduling profile fetch");
    let inner = Arc::downgrade(self);
    let task = tokio::spawn(async move {
      let Some(inner) = inner.upgrade() else { return };
      let result = inner.gateway.try_fetch_profile(user_id).await;
      if quiet && matches!(result, Ok(None)) {
        debug!(%user_id, "profile not written yet; sign-up will fetch again");
        return;
      }
      inner.commit_profile(user_id, result);
    });
    *slot = Some(ProfileFetch { user_id, task });
  }

  /// Commit a profile fetch result for `user_id`, unless the store has
  /// since moved on to someone else.
  pub(crate) fn commit_profile(
    &self,
    user_id: Uuid,
    result: Result<Option<Profile>, ProfileError>,
  ) {
    if self.state.borrow().user_id() != Some(user_id) {
      debug!(%user_id, "discarding profile for a user who is no longer current");
      return;
    }

    let failure = match &result {
      Ok(Some(_)) => None,
      Ok(None) => {
        warn!(%user_id, "signed in without a profile");
        Some("No profile exists for this account.".to_owned())
      }
      Err(e) => {
        warn!(%user_id, error = %e, "profile fetch failed");
        Some(e.to_string())
      }
    };

    let mut committed = false;
    self.commit(|s| {
      if s.user_id() != Some(user_id) {
        return;
      }
      committed = true;
      s.profile_pending = false;
      if let Ok(Some(profile)) = result {
        s.profile = Some(profile);
      }
    });

    if committed && let Some(description) = failure {
      self.notify(Notice::destructive(notice::PROFILE_UNAVAILABLE, description));
    }
  }
}

impl<B: IdentityBackend> Drop for Inner<B> {
  fn drop(&mut self) {
    if let Some(listener) = lock(&self.listener).take() {
      listener.abort();
    }
    if let Some(fetch) = lock(&self.fetch).take() {
      fetch.task.abort();
    }
  }
}
