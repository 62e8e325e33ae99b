//! Development notifier: writes delivery intents to the log instead of sending.

use async_trait::async_trait;
use verity_core::config::VerificationConfig;

use crate::{Notifier, NotifyError};

/// Logs verification messages. Selected when no SMTP host is configured.
///
/// The artifact itself is only emitted at `debug` level so that production
/// log levels never carry redeemable secrets.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    verification: VerificationConfig,
}

impl LogNotifier {
    pub fn new(verification: VerificationConfig) -> Self {
        Self { verification }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_link(&self, email: &str, token_id: &str) -> Result<(), NotifyError> {
        tracing::info!(to = email, "SMTP not configured, verification link not emailed");
        tracing::debug!(
            to = email,
            url = %self.verification.verification_url(token_id),
            "Verification link"
        );
        Ok(())
    }

    async fn send_code(&self, email: &str, code: &str) -> Result<(), NotifyError> {
        tracing::info!(to = email, "SMTP not configured, verification code not emailed");
        tracing::debug!(to = email, code, "Verification code");
        Ok(())
    }
}
