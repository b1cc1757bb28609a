//! SQLite-backed identity service for The Keeper.
//!
//! [`SqliteStore`] owns users, sessions and profiles. [`LocalBackend`] wraps
//! it as an [`IdentityBackend`](keeper_core::backend::IdentityBackend) for a
//! single in-process client.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod demo;
mod encode;
mod local;
mod schema;
mod store;
mod token;

pub mod error;

pub use error::{Error, Result};
pub use local::LocalBackend;
pub use store::{DEFAULT_SESSION_TTL_SECS, SqliteStore};
