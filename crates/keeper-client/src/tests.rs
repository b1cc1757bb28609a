//! End-to-end tests: a [`SessionStore`] over [`HttpBackend`] against a real
//! `keeper-server` bound to an ephemeral port.

use keeper_core::{
  Role,
  dashboard::{DashboardKind, DashboardView},
  demo::DEMO_PASSWORD,
  profile::ProfileSeed,
  routes::{Navigation, RouteTable},
  state::AuthPhase,
};
use keeper_server::{AppState, ServerConfig};
use keeper_session::{IdentityGateway, SessionStore};
use keeper_store_sqlite::SqliteStore;
use tokio::net::TcpListener;

use crate::{HttpBackend, HttpConfig};

async fn serve() -> String {
  let store = SqliteStore::open_in_memory().await.unwrap();
  store.seed_demo_accounts().await.unwrap();
  let app = keeper_server::router(AppState::new(store, ServerConfig::default()));

  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
  format!("http://{addr}")
}

async fn session_store(url: &str) -> SessionStore<HttpBackend> {
  let backend = HttpBackend::new(HttpConfig::new(url)).unwrap();
  SessionStore::start(IdentityGateway::new(backend)).await
}

#[tokio::test]
async fn admin_signs_in_and_reaches_the_admin_dashboard() {
  let url = serve().await;
  let store = session_store(&url).await;
  assert_eq!(store.phase(), AuthPhase::Anonymous);

  store.sign_in("admin@hexaware.com", DEMO_PASSWORD).await.unwrap();
  let state = store.settled().await;

  let profile = state.profile.as_ref().unwrap();
  assert_eq!(profile.role, Role::Admin);
  assert_eq!(profile.employee_id, "EMP001");

  let routes = RouteTable::standard();
  assert_eq!(store.navigate(&routes, "/admin-dashboard"), Navigation::Render {
    path: "/admin-dashboard".into(),
  });
  assert!(matches!(
    store.navigate(&routes, "/security-dashboard"),
    Navigation::Redirect { to: "/unauthorized", .. }
  ));
  assert_eq!(DashboardView::for_state(&state), DashboardView::Mount(DashboardKind::Admin));

  store.sign_out().await;
  assert_eq!(store.phase(), AuthPhase::Anonymous);
  assert!(matches!(
    store.navigate(&routes, "/admin-dashboard"),
    Navigation::Redirect { to: "/login", .. }
  ));
}

#[tokio::test]
async fn wrong_password_leaves_the_store_anonymous() {
  let url = serve().await;
  let store = session_store(&url).await;

  let err = store.sign_in("admin@hexaware.com", "nope").await.unwrap_err();

  assert_eq!(err, keeper_core::AuthError::InvalidCredentials);
  assert_eq!(store.phase(), AuthPhase::Anonymous);
}

#[tokio::test]
async fn sign_up_creates_an_employee_profile_on_the_server() {
  let url = serve().await;
  let store = session_store(&url).await;

  store
    .sign_up("new.hire@example.com", "password123", ProfileSeed {
      full_name: Some("New Hire".into()),
      ..ProfileSeed::default()
    })
    .await
    .unwrap();
  let state = store.settled().await;

  let profile = state.profile.as_ref().unwrap();
  assert_eq!(profile.role, Role::Employee);
  assert_eq!(profile.full_name, "New Hire");
  assert_eq!(profile.email, "new.hire@example.com");

  // A second client sees the same stored row.
  let other = session_store(&url).await;
  other.sign_in("new.hire@example.com", "password123").await.unwrap();
  let fetched = other.settled().await.profile.unwrap();
  assert_eq!(fetched.user_id, profile.user_id);
  assert_eq!(fetched.role, Role::Employee);

  other.sign_out().await;
  store.sign_out().await;
}

#[tokio::test]
async fn update_profile_round_trips_through_the_api() {
  let url = serve().await;
  let store = session_store(&url).await;
  store.sign_in("nurse@hexaware.com", DEMO_PASSWORD).await.unwrap();
  store.settled().await;

  let updated = store
    .update_profile(keeper_core::profile::ProfileUpdate {
      phone: Some(Some("+1-555-0199".into())),
      ..Default::default()
    })
    .await
    .unwrap();

  assert_eq!(updated.phone.as_deref(), Some("+1-555-0199"));
  assert_eq!(updated.role, Role::HexaNurse);
  assert_eq!(store.profile(), Some(updated));
}
