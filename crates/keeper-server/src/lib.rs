//! HTTP surface for The Keeper's identity service.
//!
//! Exposes an axum [`Router`] over a [`SqliteStore`]: token issue and
//! rotation under `/auth`, profile CRUD under `/profiles`, and the route
//! guard itself under `/access` and `/routes`.

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::{ApiError, ErrorBody};

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use keeper_core::routes::RouteTable;
use keeper_store_sqlite::{DEFAULT_SESSION_TTL_SECS, SqliteStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use handlers::{access, profiles, routes};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `keeper.toml` and
/// `KEEPER_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub session_ttl_secs:   i64,
  /// Create the four demo accounts at startup.
  pub seed_demo_accounts: bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               "127.0.0.1".to_string(),
      port:               8787,
      store_path:         PathBuf::from("keeper.db"),
      session_ttl_secs:   DEFAULT_SESSION_TTL_SECS,
      seed_demo_accounts: false,
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState {
  pub store:  Arc<SqliteStore>,
  pub config: Arc<ServerConfig>,
  pub routes: Arc<RouteTable>,
}

impl AppState {
  pub fn new(store: SqliteStore, config: ServerConfig) -> Self {
    Self {
      store:  Arc::new(store),
      config: Arc::new(config),
      routes: Arc::new(RouteTable::standard()),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the server.
pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/auth/signup",         post(handlers::auth::signup))
    .route("/auth/token",          post(handlers::auth::token))
    .route("/auth/refresh",        post(handlers::auth::refresh))
    .route("/auth/logout",         post(handlers::auth::logout))
    .route("/auth/user",           get(handlers::auth::user))
    .route("/profiles",            post(profiles::create))
    .route("/profiles/{user_id}",  get(profiles::get).patch(profiles::update))
    .route("/access",              get(access::check))
    .route("/routes",              get(routes::list))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────
