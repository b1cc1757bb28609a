//! GET /routes

use axum::{Json, extract::State};
use keeper_core::routes::Route;

use crate::AppState;

pub async fn list(State(state): State<AppState>) -> Json<Vec<Route>> {
  Json(state.routes.routes().to_vec())
}
