//! Persisted records and their creation DTOs.

pub mod account;
pub mod verification_token;
