//! Core types and trait definitions for The Keeper's identity and access
//! layer.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Everything here is either a plain data type, a pure decision function
//! (role resolution, route guarding, dashboard selection), or the
//! [`backend::IdentityBackend`] trait that concrete services implement.

pub mod backend;
pub mod dashboard;
pub mod demo;
pub mod error;
pub mod guard;
pub mod identity;
pub mod profile;
pub mod role;
pub mod routes;
pub mod state;

pub use error::{AuthError, Error, ProfileError, Result, SignUpError};
pub use role::{Role, RoleSet};
