//! Verity API server library.
//!
//! Exposes the lifecycle services, the background sweep, and the HTTP
//! adapter so integration tests and the binary entrypoint share them.

pub mod auth;
pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod service;
pub mod state;
