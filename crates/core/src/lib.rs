//! Domain primitives for the verity credential and verification-token lifecycle.
//!
//! This crate has no I/O: it holds the shared types, the error taxonomy, the
//! injectable [`clock::Clock`], artifact generation, and configuration structs
//! that the store, notifier, and service crates build on.

pub mod clock;
pub mod codes;
pub mod config;
pub mod error;
pub mod roles;
pub mod types;
