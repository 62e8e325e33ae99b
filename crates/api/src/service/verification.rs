//! Verification engine: issues link and code tokens, redeems them exactly once.
//!
//! Issuance persists the token before dispatching it, and a failed dispatch is
//! reported as [`Dispatch::Failed`] without touching the stored token. Prior
//! unconsumed tokens for the same email stay live; every issuance adds one.
//!
//! Redemption goes through [`VerificationLedger::consume_and_verify`], which
//! marks the token used and the account verified in one transaction.

use std::sync::Arc;

use serde::Serialize;
use verity_core::clock::Clock;
use verity_core::codes;
use verity_core::config::VerificationConfig;
use verity_core::error::{AuthError, AuthResult};
use verity_core::types::TokenKind;
use verity_db::models::account::Account;
use verity_db::models::verification_token::{Consumption, VerificationToken};
use verity_db::store::{Stores, TokenStore, VerificationLedger};
use verity_notify::{Notifier, NotifyError};

/// Whether an issued artifact reached the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Dispatch {
    Delivered,
    Failed { reason: String },
}

impl Dispatch {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Dispatch::Delivered)
    }

    fn from_send(result: Result<(), NotifyError>, email: &str, kind: TokenKind) -> Self {
        match result {
            Ok(()) => Dispatch::Delivered,
            Err(e) => {
                tracing::warn!(email, %kind, error = %e, "Verification dispatch failed, token kept");
                Dispatch::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// A persisted token and the outcome of dispatching it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: VerificationToken,
    pub dispatch: Dispatch,
}

pub struct VerificationEngine {
    tokens: Arc<dyn TokenStore>,
    ledger: Arc<dyn VerificationLedger>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: VerificationConfig,
}

impl VerificationEngine {
    pub fn new(
        stores: &Stores,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: VerificationConfig,
    ) -> Self {
        Self {
            tokens: Arc::clone(&stores.tokens),
            ledger: Arc::clone(&stores.ledger),
            notifier,
            clock,
            config,
        }
    }

    /// Persist a fresh link token for `email` and send it.
    pub async fn issue_link_token(&self, email: &str) -> AuthResult<IssuedToken> {
        let token = self.link_token(email);
        self.tokens.save(&token).await?;
        Ok(self.dispatch(token).await)
    }

    /// Persist a fresh 6-digit code token for `email` and send the code.
    pub async fn issue_code_token(&self, email: &str) -> AuthResult<IssuedToken> {
        let code = codes::generate_numeric_code();
        let token = self.new_token(email, TokenKind::Code, Some(code));
        self.tokens.save(&token).await?;
        Ok(self.dispatch(token).await)
    }

    /// A fresh, unsaved link token for `email`.
    pub fn link_token(&self, email: &str) -> VerificationToken {
        self.new_token(email, TokenKind::Link, None)
    }

    /// Send an already persisted token through the notifier.
    pub async fn dispatch(&self, token: VerificationToken) -> IssuedToken {
        tracing::info!(email = %token.email, kind = %token.kind, expires_at = %token.expires_at, "Verification token issued");

        let sent = match token.code.as_deref() {
            Some(code) => self.notifier.send_code(&token.email, code).await,
            None => self.notifier.send_link(&token.email, &token.id).await,
        };
        IssuedToken {
            dispatch: Dispatch::from_send(sent, &token.email, token.kind),
            token,
        }
    }

    /// Redeem a link token by id. Returns the now-verified account.
    pub async fn redeem_by_token(&self, token_id: &str) -> AuthResult<Account> {
        let outcome = self
            .ledger
            .consume_and_verify(token_id, self.clock.now())
            .await?;

        match outcome {
            Consumption::Verified { account, token } => {
                tracing::info!(username = %account.username, kind = %token.kind, "Email verified");
                Ok(account)
            }
            Consumption::NotFound => Err(AuthError::TokenNotFound),
            Consumption::AlreadyUsed => Err(AuthError::TokenAlreadyUsed),
            Consumption::Expired => Err(AuthError::TokenExpired),
            Consumption::AccountMissing => Err(AuthError::AccountNotFound),
        }
    }

    /// Redeem a numeric code issued to `email`.
    ///
    /// Wrong, malformed, and already-consumed codes all report
    /// [`AuthError::InvalidCode`].
    pub async fn redeem_by_code(&self, email: &str, code: &str) -> AuthResult<Account> {
        if !codes::is_well_formed_code(code) {
            tracing::debug!(email, "Rejected malformed verification code");
            return Err(AuthError::InvalidCode);
        }

        let token = self
            .tokens
            .find_by_email_and_code_unused(email, code)
            .await?
            .ok_or_else(|| {
                tracing::debug!(email, "No live token matches verification code");
                AuthError::InvalidCode
            })?;

        let now = self.clock.now();
        if token.is_expired_at(now) {
            return Err(AuthError::TokenExpired);
        }

        match self.ledger.consume_and_verify(&token.id, now).await? {
            Consumption::Verified { account, .. } => {
                tracing::info!(username = %account.username, kind = %TokenKind::Code, "Email verified");
                Ok(account)
            }
            // Lost a race with a concurrent redemption of the same code.
            Consumption::AlreadyUsed | Consumption::NotFound => Err(AuthError::InvalidCode),
            Consumption::Expired => Err(AuthError::TokenExpired),
            Consumption::AccountMissing => Err(AuthError::AccountNotFound),
        }
    }

    fn new_token(&self, email: &str, kind: TokenKind, code: Option<String>) -> VerificationToken {
        let now = self.clock.now();
        let ttl = match kind {
            TokenKind::Link => self.config.link_expiry,
            TokenKind::Code => self.config.code_expiry,
        };
        VerificationToken {
            id: codes::generate_token_id(),
            email: email.to_string(),
            code,
            kind,
            expires_at: now + ttl,
            used: false,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Duration;
    use verity_core::clock::ManualClock;
    use verity_core::roles::default_roles;
    use verity_db::memory::MemoryStore;
    use verity_db::models::account::NewAccount;
    use verity_db::store::AccountStore;
    use verity_notify::RecordingNotifier;

    use super::*;

    struct Fixture {
        store: Arc<MemoryStore>,
        notifier: Arc<RecordingNotifier>,
        clock: Arc<ManualClock>,
        engine: VerificationEngine,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let clock = Arc::new(ManualClock::starting_now());
        let engine = VerificationEngine::new(
            &Stores::shared(store.clone()),
            notifier.clone(),
            clock.clone(),
            VerificationConfig::default(),
        );
        store
            .insert_if_absent(NewAccount {
                username: "alice".into(),
                email: "alice@x.com".into(),
                password_hash: "digest".into(),
                roles: default_roles(),
                created_at: clock.now(),
            })
            .await
            .expect("insert should succeed");
        Fixture {
            store,
            notifier,
            clock,
            engine,
        }
    }

    #[tokio::test]
    async fn link_token_is_persisted_and_sent() {
        let f = fixture().await;
        let issued = f.engine.issue_link_token("alice@x.com").await.unwrap();

        assert!(issued.dispatch.is_delivered());
        assert_eq!(issued.token.kind, TokenKind::Link);
        assert_eq!(issued.token.code, None);
        assert_eq!(issued.token.expires_at - issued.token.created_at, Duration::hours(24));
        assert_eq!(f.notifier.last_link_for("alice@x.com"), Some(issued.token.id.clone()));
        assert_eq!(f.store.token_count().await, 1);
    }

    #[tokio::test]
    async fn link_token_is_only_stored_by_the_caller() {
        let f = fixture().await;
        let token = f.engine.link_token("alice@x.com");
        assert_eq!(f.store.token_count().await, 0);

        let issued = f.engine.dispatch(token).await;
        assert!(issued.dispatch.is_delivered());
        assert_eq!(f.notifier.last_link_for("alice@x.com"), Some(issued.token.id));
        assert_eq!(f.store.token_count().await, 0);
    }

    #[tokio::test]
    async fn code_token_carries_six_digits() {
        let f = fixture().await;
        let issued = f.engine.issue_code_token("alice@x.com").await.unwrap();

        let code = issued.token.code.clone().expect("code tokens carry a code");
        assert!(codes::is_well_formed_code(&code));
        assert_eq!(issued.token.expires_at - issued.token.created_at, Duration::minutes(10));
        assert_eq!(f.notifier.last_code_for("alice@x.com"), Some(code));
    }

    #[tokio::test]
    async fn failed_dispatch_keeps_the_token_redeemable() {
        let f = fixture().await;
        f.notifier.set_failing(true);

        let issued = f.engine.issue_link_token("alice@x.com").await.unwrap();
        assert_matches!(issued.dispatch, Dispatch::Failed { .. });

        let account = f.engine.redeem_by_token(&issued.token.id).await.unwrap();
        assert!(account.verified);
    }

    #[tokio::test]
    async fn second_link_redemption_reports_already_used() {
        let f = fixture().await;
        let issued = f.engine.issue_link_token("alice@x.com").await.unwrap();

        f.engine.redeem_by_token(&issued.token.id).await.unwrap();
        assert_matches!(
            f.engine.redeem_by_token(&issued.token.id).await,
            Err(AuthError::TokenAlreadyUsed)
        );
    }

    #[tokio::test]
    async fn unknown_link_token_is_not_found() {
        let f = fixture().await;
        assert_matches!(
            f.engine.redeem_by_token("no-such-token").await,
            Err(AuthError::TokenNotFound)
        );
    }

    #[tokio::test]
    async fn expired_code_is_rejected_after_eleven_minutes() {
        let f = fixture().await;
        let issued = f.engine.issue_code_token("alice@x.com").await.unwrap();
        let code = issued.token.code.unwrap();

        f.clock.advance(Duration::minutes(11));
        assert_matches!(
            f.engine.redeem_by_code("alice@x.com", &code).await,
            Err(AuthError::TokenExpired)
        );
    }

    #[tokio::test]
    async fn code_redeemed_twice_is_invalid_the_second_time() {
        let f = fixture().await;
        let code = f.engine.issue_code_token("alice@x.com").await.unwrap().token.code.unwrap();

        f.engine.redeem_by_code("alice@x.com", &code).await.unwrap();
        assert_matches!(
            f.engine.redeem_by_code("alice@x.com", &code).await,
            Err(AuthError::InvalidCode)
        );
    }

    #[tokio::test]
    async fn malformed_or_wrong_email_codes_are_invalid() {
        let f = fixture().await;
        let code = f.engine.issue_code_token("alice@x.com").await.unwrap().token.code.unwrap();

        assert_matches!(
            f.engine.redeem_by_code("alice@x.com", "12ab56").await,
            Err(AuthError::InvalidCode)
        );
        assert_matches!(
            f.engine.redeem_by_code("bob@x.com", &code).await,
            Err(AuthError::InvalidCode)
        );
    }

    #[tokio::test]
    async fn token_for_unregistered_email_reports_account_not_found() {
        let f = fixture().await;
        let issued = f.engine.issue_link_token("ghost@x.com").await.unwrap();

        assert_matches!(
            f.engine.redeem_by_token(&issued.token.id).await,
            Err(AuthError::AccountNotFound)
        );
        let token = f.store.find_by_id(&issued.token.id).await.unwrap().unwrap();
        assert!(!token.used);
    }
}
