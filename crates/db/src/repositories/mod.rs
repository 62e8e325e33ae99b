//! PostgreSQL repositories and the [`PgStore`] backend built on them.

pub mod account_repo;
pub mod pg_store;
pub mod verification_token_repo;

pub use account_repo::AccountRepo;
pub use pg_store::PgStore;
pub use verification_token_repo::VerificationTokenRepo;
