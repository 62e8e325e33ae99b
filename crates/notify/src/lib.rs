//! Out-of-band delivery of verification artifacts.
//!
//! The lifecycle services only depend on the [`Notifier`] contract. Delivery
//! is fire-and-forget from their point of view: a failure is reported back as
//! a value and never undoes an already-persisted token.
//!
//! - [`email::EmailNotifier`] -- SMTP delivery via `lettre`.
//! - [`log::LogNotifier`] -- logs instead of sending; used when SMTP is not configured.
//! - [`capture::RecordingNotifier`] -- keeps every message in memory for tests.

use async_trait::async_trait;

pub mod capture;
pub mod email;
pub mod log;
pub mod templates;

pub use capture::{RecordingNotifier, SentMessage};
pub use email::{EmailConfig, EmailNotifier};
pub use log::LogNotifier;

/// Error type for delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// The channel refused the message for a non-transport reason.
    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

/// Delivers verification artifacts to the owner of an email address.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a link token. The notifier builds the user-facing URL.
    async fn send_link(&self, email: &str, token_id: &str) -> Result<(), NotifyError>;

    /// Deliver a numeric verification code.
    async fn send_code(&self, email: &str, code: &str) -> Result<(), NotifyError>;
}
