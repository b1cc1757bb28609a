//! Client-side session management for The Keeper.
//!
//! [`IdentityGateway`] bounds every call to an
//! [`IdentityBackend`](keeper_core::backend::IdentityBackend) with a timeout.
//! [`SessionStore`] sits on top of it and keeps the one authoritative
//! [`AuthState`](keeper_core::state::AuthState): it probes for an existing
//! session at startup, follows the backend's session events, loads the
//! signed-in user's profile, and reports outcomes as [`Notice`]s.

pub mod gateway;
pub mod notice;
pub mod store;

pub use gateway::{GatewayConfig, IdentityGateway};
pub use notice::{Notice, NoticeLevel};
pub use store::SessionStore;
