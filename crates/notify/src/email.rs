//! Verification delivery via SMTP.
//!
//! [`EmailNotifier`] wraps the `lettre` async SMTP transport. Configuration is
//! loaded from environment variables; if `SMTP_HOST` is not set,
//! [`EmailConfig::from_env`] returns `Ok(None)` and no mailer should be
//! constructed.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use verity_core::config::{parse_or, ConfigError, VerificationConfig};

use crate::templates::{self, RenderedEmail};
use crate::{Notifier, NotifyError};

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@verity.local";

/// Configuration for the SMTP delivery service.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` if `SMTP_HOST` is not set, and an error if
    /// `SMTP_PORT` is set but is not a valid port.
    ///
    /// | Variable        | Required | Default                 |
    /// |-----------------|----------|-------------------------|
    /// | `SMTP_HOST`     | yes      | --                      |
    /// | `SMTP_PORT`     | no       | `587`                   |
    /// | `SMTP_FROM`     | no       | `noreply@verity.local`  |
    /// | `SMTP_USER`     | no       | --                      |
    /// | `SMTP_PASSWORD` | no       | --                      |
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(smtp_host) = lookup("SMTP_HOST") else {
            return Ok(None);
        };
        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_or(&lookup, "SMTP_PORT", DEFAULT_SMTP_PORT)?,
            from_address: lookup("SMTP_FROM")
                .unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: lookup("SMTP_USER"),
            smtp_password: lookup("SMTP_PASSWORD"),
        }))
    }
}

// ---------------------------------------------------------------------------
// EmailNotifier
// ---------------------------------------------------------------------------

/// Sends verification links and codes by email.
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    verification: VerificationConfig,
}

impl EmailNotifier {
    /// Build the SMTP transport. No connection is opened until the first send.
    pub fn new(config: EmailConfig, verification: VerificationConfig) -> Result<Self, NotifyError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (config.smtp_user, config.smtp_password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            mailer: builder.build(),
            from_address: config.from_address,
            verification,
        })
    }

    async fn deliver(&self, to_email: &str, email: RenderedEmail) -> Result<(), NotifyError> {
        let message = Message::builder()
            .from(self.from_address.parse()?)
            .to(to_email.parse()?)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        self.mailer.send(message).await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send_link(&self, email: &str, token_id: &str) -> Result<(), NotifyError> {
        let url = self.verification.verification_url(token_id);
        self.deliver(
            email,
            templates::verification_link(&url, self.verification.link_expiry),
        )
        .await?;
        tracing::info!(to = email, "Verification link email sent");
        Ok(())
    }

    async fn send_code(&self, email: &str, code: &str) -> Result<(), NotifyError> {
        self.deliver(
            email,
            templates::verification_code(code, self.verification.code_expiry),
        )
        .await?;
        tracing::info!(to = email, "Verification code email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 2525,
            from_address: "noreply@example.com".to_string(),
            smtp_user: None,
            smtp_password: None,
        }
    }

    #[test]
    fn email_error_display_build() {
        let err = NotifyError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }

    #[test]
    fn email_error_display_address() {
        let addr_err: Result<lettre::Address, _> = "not-an-email".parse();
        let err = NotifyError::Address(addr_err.unwrap_err());
        assert!(err.to_string().contains("Email address parse error"));
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    #[test]
    fn missing_host_disables_email() {
        let config = EmailConfig::from_lookup(lookup(&[("SMTP_PORT", "2525")])).unwrap();
        assert!(config.is_none());
    }

    #[test]
    fn defaults_apply_when_only_host_is_set() {
        let config = EmailConfig::from_lookup(lookup(&[("SMTP_HOST", "mail.local")]))
            .unwrap()
            .expect("host is set");
        assert_eq!(config.smtp_port, DEFAULT_SMTP_PORT);
        assert_eq!(config.from_address, DEFAULT_FROM_ADDRESS);
        assert_eq!(config.smtp_user, None);
    }

    #[test]
    fn malformed_port_is_rejected() {
        let result = EmailConfig::from_lookup(lookup(&[
            ("SMTP_HOST", "mail.local"),
            ("SMTP_PORT", "not-a-port"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { var: "SMTP_PORT", .. })
        ));
    }

    #[tokio::test]
    async fn bad_recipient_fails_before_any_connection() {
        let notifier = EmailNotifier::new(config(), VerificationConfig::default())
            .expect("transport should build without connecting");

        let result = notifier.send_code("not-an-email", "123456").await;
        assert!(matches!(result, Err(NotifyError::Address(_))));
    }
}
