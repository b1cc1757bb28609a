//! [`HttpBackend`] — an [`IdentityBackend`] that talks to `keeper-server`
//! over its JSON API.

use std::{
  future::Future,
  sync::{Mutex, MutexGuard, PoisonError},
  time::Duration,
};

use keeper_core::{
  AuthError, ProfileError,
  backend::IdentityBackend,
  identity::{AuthEvent, Session, SignUpOutcome},
  profile::{NewProfile, Profile, ProfileUpdate},
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 16;

/// Connection settings for the Keeper API.
#[derive(Debug, Clone)]
pub struct HttpConfig {
  pub base_url: String,
  pub timeout:  Duration,
}

impl HttpConfig {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self { base_url: base_url.into(), timeout: Duration::from_secs(30) }
  }
}

/// `{"error": kind, "message": text}` as sent by the server.
#[derive(Debug, Deserialize)]
struct ErrorBody {
  error:   String,
  message: String,
}

/// A failed call: either the server answered with an error, or it could not
/// be reached or understood.
#[derive(Debug)]
enum Failure {
  Api { status: StatusCode, body: ErrorBody },
  Transport(String),
}

impl Failure {
  fn into_auth(self) -> AuthError {
    match self {
      Self::Api { body, .. } => AuthError::from_kind(&body.error, body.message),
      Self::Transport(msg) => AuthError::Network(msg),
    }
  }

  /// Read-side mapping.
  fn into_read(self) -> ProfileError {
    match self {
      Self::Api { body, .. } => ProfileError::Transport(body.message),
      Self::Transport(msg) => ProfileError::Transport(msg),
    }
  }

  /// Write-side mapping.
  fn into_write(self, user_id: Uuid) -> ProfileError {
    match self {
      Self::Api { body, .. } => match body.error.as_str() {
        "not_found" => ProfileError::NotFound(user_id),
        "conflict" => ProfileError::Conflict(body.message),
        "transport" => ProfileError::Transport(body.message),
        _ => ProfileError::WriteFailed(body.message),
      },
      Self::Transport(msg) => ProfileError::WriteFailed(msg),
    }
  }

  fn status(&self) -> Option<StatusCode> {
    match self {
      Self::Api { status, .. } => Some(*status),
      Self::Transport(_) => None,
    }
  }
}

impl From<reqwest::Error> for Failure {
  fn from(e: reqwest::Error) -> Self { Self::Transport(e.to_string()) }
}

// ─── Backend ─────────────────────────────────────────────────────────────────

/// HTTP client for the Keeper JSON API, holding the one current session.
pub struct HttpBackend {
  client:   Client,
  base_url: String,
  current:  Mutex<Option<Session>>,
  events:   broadcast::Sender<AuthEvent>,
}

impl HttpBackend {
  pub fn new(config: HttpConfig) -> reqwest::Result<Self> {
    let client = Client::builder().timeout(config.timeout).build()?;
    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    Ok(Self {
      client,
      base_url: config.base_url.trim_end_matches('/').to_owned(),
      current: Mutex::new(None),
      events,
    })
  }

  fn url(&self, path: &str) -> String { format!("{}{path}", self.base_url) }

  fn current(&self) -> MutexGuard<'_, Option<Session>> {
    self.current.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn access_token(&self) -> Option<String> {
    self.current().as_ref().map(|s| s.access_token.clone())
  }

  fn authed(&self, req: RequestBuilder) -> RequestBuilder {
    match self.access_token() {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }

  fn announce(&self, event: AuthEvent) {
    debug!(?event, "auth event");
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

  async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, Failure> {
    let resp = Self::check(req.send().await?).await?;
    Ok(resp.json().await?)
  }

  async fn check(resp: Response) -> Result<Response, Failure> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let body = resp.json::<ErrorBody>().await.unwrap_or_else(|e| ErrorBody {
      error:   "unknown".into(),
      message: format!("{status}: {e}"),
    });
    Err(Failure::Api { status, body })
  }
}

impl IdentityBackend for HttpBackend {
  fn sign_in_with_password<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Session, AuthError>> + Send + 'a {
    async move {
      let req = self
        .client
        .post(self.url("/auth/token"))
        .json(&json!({ "email": email, "password": password }));
      let session: Session = Self::send(req).await.map_err(Failure::into_auth)?;
      self.adopt(session.clone(), AuthEvent::SignedIn);
      Ok(session)
    }
  }

  fn sign_up<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<SignUpOutcome, AuthError>> + Send + 'a {
    async move {
      let req = self
        .client
        .post(self.url("/auth/signup"))
        .json(&json!({ "email": email, "password": password }));
      let outcome: SignUpOutcome = Self::send(req).await.map_err(Failure::into_auth)?;
      if let Some(session) = &outcome.session {
        self.adopt(session.clone(), AuthEvent::SignedIn);
      }
      Ok(outcome)
    }
  }

  fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send + '_ {
    async move {
      let Some(session) = self.current().take() else {
        return Ok(());
      };
      self.announce(AuthEvent::SignedOut);
      let req = self.client.post(self.url("/auth/logout")).bearer_auth(&session.access_token);
      Self::check(req.send().await.map_err(|e| AuthError::Network(e.to_string()))?)
        .await
        .map_err(Failure::into_auth)?;
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
      if session.is_expired() {
        self.expire();
        return Ok(None);
      }
      let req = self.client.get(self.url("/auth/user")).bearer_auth(&session.access_token);
      match Self::send::<serde_json::Value>(req).await {
        Ok(_) => Ok(Some(session)),
        Err(e) if e.status() == Some(StatusCode::UNAUTHORIZED) => {
          debug!("server no longer accepts the session");
          self.expire();
          Ok(None)
        }
        Err(e) => Err(e.into_auth()),
      }
    }
  }

  fn refresh_session(&self) -> impl Future<Output = Result<Session, AuthError>> + Send + '_ {
    async move {
      let Some(refresh_token) = self.current().as_ref().map(|s| s.refresh_token.clone())
      else {
        return Err(AuthError::Unknown("no session to refresh".into()));
      };
      let req = self
        .client
        .post(self.url("/auth/refresh"))
        .json(&json!({ "refresh_token": refresh_token }));
      match Self::send::<Session>(req).await {
        Ok(session) => {
          self.adopt(session.clone(), AuthEvent::TokenRefreshed);
          Ok(session)
        }
        Err(e) => {
          if e.status() == Some(StatusCode::UNAUTHORIZED) {
            warn!("refresh token rejected");
            self.expire();
          }
          Err(e.into_auth())
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
      let req = self.authed(self.client.get(self.url(&format!("/profiles/{user_id}"))));
      match Self::send::<Profile>(req).await {
        Ok(profile) => Ok(Some(profile)),
        Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => Ok(None),
        Err(e) => Err(e.into_read()),
      }
    }
  }

  fn insert_profile(
    &self,
    profile: NewProfile,
  ) -> impl Future<Output = Result<Profile, ProfileError>> + Send + '_ {
    async move {
      let user_id = profile.user_id;
      let req = self.authed(self.client.post(self.url("/profiles"))).json(&profile);
      Self::send(req).await.map_err(|e| e.into_write(user_id))
    }
  }

  fn update_profile(
    &self,
    user_id: Uuid,
    update: ProfileUpdate,
  ) -> impl Future<Output = Result<Profile, ProfileError>> + Send + '_ {
    async move {
      let req = self
        .authed(self.client.patch(self.url(&format!("/profiles/{user_id}"))))
        .json(&update);
      Self::send(req).await.map_err(|e| e.into_write(user_id))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn api(status: StatusCode, kind: &str) -> Failure {
    Failure::Api {
      status,
      body: ErrorBody { error: kind.into(), message: "from server".into() },
    }
  }

  #[test]
  fn server_kinds_map_back_to_auth_errors() {
    assert_eq!(
      api(StatusCode::UNAUTHORIZED, "invalid_credentials").into_auth(),
      AuthError::InvalidCredentials
    );
    assert_eq!(
      api(StatusCode::CONFLICT, "already_registered").into_auth(),
      AuthError::AlreadyRegistered
    );
    assert_eq!(
      Failure::Transport("refused".into()).into_auth(),
      AuthError::Network("refused".into())
    );
  }

  #[test]
  fn server_kinds_map_back_to_profile_errors() {
    let id = Uuid::new_v4();
    assert_eq!(api(StatusCode::NOT_FOUND, "not_found").into_write(id), ProfileError::NotFound(id));
    assert!(matches!(
      api(StatusCode::CONFLICT, "conflict").into_write(id),
      ProfileError::Conflict(_)
    ));
    assert!(matches!(
      api(StatusCode::FORBIDDEN, "forbidden").into_write(id),
      ProfileError::WriteFailed(_)
    ));
    assert!(matches!(
      api(StatusCode::INTERNAL_SERVER_ERROR, "internal").into_read(),
      ProfileError::Transport(_)
    ));
  }

  #[test]
  fn base_url_loses_trailing_slash() {
    let backend = HttpBackend::new(HttpConfig::new("http://localhost:8787/")).unwrap();
    assert_eq!(backend.url("/auth/token"), "http://localhost:8787/auth/token");
  }
}
