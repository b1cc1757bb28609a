//! `/profiles` — create, read and update profiles.
//!
//! A caller may touch their own profile. Admins may read and update anyone's.
//! Only admins may change `is_active`.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use keeper_core::{
  ProfileError, Role,
  profile::{NewProfile, Profile, ProfileUpdate},
  role::resolve_role,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::ApiError};

async fn is_admin(state: &AppState, auth: &Authenticated) -> Result<bool, ApiError> {
  Ok(
    state
      .store
      .get_profile(auth.user.id)
      .await?
      .is_some_and(|p| p.is_active && p.role == Role::Admin),
  )
}

async fn ensure_access(
  state: &AppState,
  auth: &Authenticated,
  user_id: Uuid,
) -> Result<(), ApiError> {
  if auth.user.id == user_id || is_admin(state, auth).await? {
    Ok(())
  } else {
    Err(ApiError::Forbidden)
  }
}

/// POST /profiles: create the caller's own profile.
///
/// The stored role is always the one resolved from the caller's address,
/// whatever the body says.
pub async fn create(
  State(state): State<AppState>,
  auth: Authenticated,
  Json(mut new): Json<NewProfile>,
) -> Result<(StatusCode, Json<Profile>), ApiError> {
  if new.user_id != auth.user.id {
    return Err(ApiError::Forbidden);
  }
  let role = resolve_role(&auth.user.email);
  if new.role != role {
    warn!(user_id = %auth.user.id, requested = %new.role, %role, "ignoring requested role");
  }
  new.role = role;
  new.email = auth.user.email.clone();

  let profile = state.store.insert_profile(new).await.map_err(ProfileError::from)?;
  Ok((StatusCode::CREATED, Json(profile)))
}

/// GET /profiles/{user_id}
pub async fn get(
  State(state): State<AppState>,
  auth: Authenticated,
  Path(user_id): Path<Uuid>,
) -> Result<Json<Profile>, ApiError> {
  ensure_access(&state, &auth, user_id).await?;
  let profile = state
    .store
    .get_profile(user_id)
    .await?
    .ok_or(ProfileError::NotFound(user_id))?;
  Ok(Json(profile))
}

/// PATCH /profiles/{user_id}
pub async fn update(
  State(state): State<AppState>,
  auth: Authenticated,
  Path(user_id): Path<Uuid>,
  Json(update): Json<ProfileUpdate>,
) -> Result<Json<Profile>, ApiError> {
  ensure_access(&state, &auth, user_id).await?;
  if update.is_active.is_some() && !is_admin(&state, &auth).await? {
    return Err(ApiError::Forbidden);
  }
  let profile = state
    .store
    .update_profile(user_id, update)
    .await
    .map_err(ProfileError::from)?;
  info!(%user_id, by = %auth.user.id, "profile updated");
  Ok(Json(profile))
}
