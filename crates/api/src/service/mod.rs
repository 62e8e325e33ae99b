//! The credential and verification lifecycle.
//!
//! [`AuthService`] is the surface the transport layer consumes. It composes
//! the [`CredentialManager`], the [`VerificationEngine`], and the
//! [`SessionIssuer`], and owns no state of its own beyond their collaborators.

pub mod credentials;
pub mod verification;

use std::sync::Arc;

use serde::Serialize;
use verity_core::clock::Clock;
use verity_core::config::{SessionConfig, VerificationConfig};
use verity_core::error::{AuthError, AuthResult};
use verity_core::types::{RoleSet, Timestamp};
use verity_db::models::account::Account;
use verity_db::store::{AccountStore, Stores};
use verity_notify::Notifier;

use crate::auth::jwt::{SessionClaims, SessionIssuer, SessionToken};
use crate::auth::password::CredentialHasher;

pub use credentials::CredentialManager;
pub use verification::{Dispatch, IssuedToken, VerificationEngine};

const REGISTERED: &str = "User registered successfully. Please check your email to verify your account.";
const REGISTERED_UNSENT: &str = "User registered successfully, but the verification email could not be sent. \
     Please request a new verification link.";
const VERIFIED: &str = "Email verified successfully. You can now login.";

/// Result of a successful registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub account: Account,
    pub message: &'static str,
    /// Delivery of the initial link token.
    pub dispatch: Dispatch,
}

/// Result of a successful token or code redemption.
#[derive(Debug, Clone, Serialize)]
pub struct Redemption {
    pub username: String,
    pub message: &'static str,
}

/// Public view of an account. Never carries the credential digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub username: String,
    pub email: String,
    pub roles: RoleSet,
    pub enabled: bool,
    pub verified: bool,
    pub created_at: Timestamp,
}

impl From<Account> for Profile {
    fn from(account: Account) -> Self {
        Self {
            username: account.username,
            email: account.email,
            roles: account.roles,
            enabled: account.enabled,
            verified: account.verified,
            created_at: account.created_at,
        }
    }
}

/// Everything [`AuthService`] needs besides its stores.
pub struct AuthServiceConfig {
    pub verification: VerificationConfig,
    pub session: SessionConfig,
}

pub struct AuthService {
    accounts: Arc<dyn AccountStore>,
    credentials: CredentialManager,
    verification: VerificationEngine,
    sessions: SessionIssuer,
}

impl AuthService {
    pub fn new(
        stores: Stores,
        notifier: Arc<dyn Notifier>,
        hasher: Arc<dyn CredentialHasher>,
        clock: Arc<dyn Clock>,
        config: AuthServiceConfig,
    ) -> Self {
        Self {
            credentials: CredentialManager::new(&stores, hasher, Arc::clone(&clock)),
            verification: VerificationEngine::new(
                &stores,
                notifier,
                Arc::clone(&clock),
                config.verification,
            ),
            sessions: SessionIssuer::new(&config.session, clock),
            accounts: stores.accounts,
        }
    }

    /// Store the account with its first link token, then dispatch the link.
    ///
    /// The account and token are persisted as one unit; a store failure
    /// leaves neither behind. A failed dispatch still returns `Ok`: the
    /// account and token exist and the message points the user at the resend
    /// endpoint.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<Registration> {
        let token = self.verification.link_token(email);
        let account = self
            .credentials
            .create_account(username, email, password, &token)
            .await?;
        let issued = self.verification.dispatch(token).await;

        let message = if issued.dispatch.is_delivered() {
            REGISTERED
        } else {
            REGISTERED_UNSENT
        };
        Ok(Registration {
            account,
            message,
            dispatch: issued.dispatch,
        })
    }

    /// Authenticate and mint a session token.
    pub async fn login(&self, identifier: &str, password: &str) -> AuthResult<SessionToken> {
        let identity = self.credentials.authenticate(identifier, password).await?;
        let session = self.sessions.issue(&identity)?;
        tracing::info!(username = %identity.username, expires_at = %session.expires_at, "Login succeeded");
        Ok(session)
    }

    pub async fn redeem_by_token(&self, token_id: &str) -> AuthResult<Redemption> {
        let account = self.verification.redeem_by_token(token_id).await?;
        Ok(redeemed(account))
    }

    pub async fn redeem_by_code(&self, email: &str, code: &str) -> AuthResult<Redemption> {
        let account = self.verification.redeem_by_code(email, code).await?;
        Ok(redeemed(account))
    }

    /// Issue another link token. Earlier unconsumed tokens stay valid.
    pub async fn issue_link_token(&self, email: &str) -> AuthResult<IssuedToken> {
        self.verification.issue_link_token(email).await
    }

    /// Issue another code token. Earlier unconsumed codes stay valid.
    pub async fn issue_code_token(&self, email: &str) -> AuthResult<IssuedToken> {
        self.verification.issue_code_token(email).await
    }

    pub async fn profile(&self, username: &str) -> AuthResult<Profile> {
        self.accounts
            .find_by_username(username)
            .await?
            .map(Profile::from)
            .ok_or(AuthError::AccountNotFound)
    }

    /// Validate a bearer token without touching any store.
    pub fn validate_session(&self, token: &str) -> AuthResult<SessionClaims> {
        self.sessions.validate(token)
    }
}

fn redeemed(account: Account) -> Redemption {
    Redemption {
        username: account.username,
        message: VERIFIED,
    }
}
