//! Client side of The Keeper: an HTTP identity backend and the text
//! rendering used by the `keeper` binary.

pub mod http;
pub mod report;

pub use http::{HttpBackend, HttpConfig};

#[cfg(test)]
mod tests;
