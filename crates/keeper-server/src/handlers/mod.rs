pub mod access;
pub mod auth;
pub mod profiles;
pub mod routes;
