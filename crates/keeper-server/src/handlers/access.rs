//! GET /access?path= — run the route guard for the caller.

use axum::{
  Json,
  extract::{Query, State},
};
use keeper_core::{
  dashboard::DashboardView,
  guard::Decision,
  identity::Session,
  routes::{Navigation, landing_path},
  state::AuthState,
};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::{Authenticated, MaybeAuthenticated},
  error::ApiError,
};

#[derive(Debug, Deserialize)]
pub struct AccessQuery {
  pub path: String,
}

/// What a client navigating to `path` would see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessReport {
  pub decision:  Decision,
  /// Where the client ends up: the route itself, or the redirect target.
  pub location:  String,
  pub dashboard: DashboardView,
  /// The signed-in user's own dashboard, once their profile is known.
  pub landing:   Option<String>,
}

/// The caller's identity as the route guard sees it.
async fn auth_state(state: &AppState, auth: Option<Authenticated>) -> Result<AuthState, ApiError> {
  let Some(auth) = auth else {
    return Ok(AuthState::anonymous());
  };
  let profile = state.store.get_profile(auth.user.id).await?;
  let session = Session {
    access_token:  auth.token,
    refresh_token: String::new(),
    expires_at:    auth.expires_at,
    user:          auth.user,
  };
  let mut state = AuthState::authenticated(session);
  state.profile = profile;
  Ok(state)
}

pub async fn check(
  State(state): State<AppState>,
  MaybeAuthenticated(auth): MaybeAuthenticated,
  Query(query): Query<AccessQuery>,
) -> Result<Json<AccessReport>, ApiError> {
  let auth_state = auth_state(&state, auth).await?;
  let (decision, location) = match state.routes.navigate(&query.path, &auth_state) {
    Navigation::Render { path } => (Decision::Render, path),
    Navigation::RenderLoading { path } => (Decision::RenderLoading, path),
    Navigation::Redirect { to, decision } => (decision, to.to_owned()),
    Navigation::NotFound { path } => return Err(ApiError::RouteNotFound(path)),
  };
  Ok(Json(AccessReport {
    decision,
    location,
    dashboard: DashboardView::for_state(&auth_state),
    landing: landing_path(&auth_state).map(str::to_owned),
  }))
}
